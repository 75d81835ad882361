pub mod hooks;

use crate::entities::creature::{Creature, CreatureId, CreatureKind, Outfit};
use crate::entities::player::{PlayerLocal, Vip};
use crate::net::connection::Connection;
use crate::net::protocol::{ServerMessage, Speech, SpeechTo, TextMessageKind};
use crate::persistence::database::{Account, Database, PlayerRecord, VipRecord};
use crate::telemetry::logging;
use crate::world::channels::{ChannelId, ChannelRegistry};
use crate::world::map::Map;
use crate::world::position::{Direction, Position, GROUND_FLOOR};
use crate::world::tile::Tile;
use crate::world::time::GameClock;
use self::hooks::{
    ChannelEvent, ChannelSpeechEvent, CreatureEvent, DefaultSpeechEvent, GameHooks, HealthEvent,
    LoginEvent, LogoutEvent, MoveEvent, OutfitEvent, PrivateChannelEvent, PrivateSpeechEvent,
    SpeechEvent, TurnEvent, VipAddEvent, VipRemoveEvent, WalkCancelEvent,
};
use std::collections::HashMap;
use std::time::Duration;

/// Where characters without a usable saved position enter the world.
pub const DEFAULT_SPAWN: Position = Position { x: 97, y: 205, z: 7 };

/// Whispers carry one tile, diagonals included.
pub const WHISPER_RANGE: f64 = 1.42;

/// Yells carry fifty tiles.
pub const YELL_RANGE: f64 = 50.0;

pub const YELL_COOLDOWN: Duration = Duration::from_secs(30);

/// What out-of-earshot spectators hear instead of the whispered text.
const WHISPER_FILLER: &str = "pspsps";

/// First id handed out to player characters. Everything below is reserved
/// for other creature kinds.
pub const PLAYER_ID_BASE: u32 = 0x4000_0001;

/// No free player id left in the configured range. Not retryable; the
/// store has to be compacted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpaceExhausted;

impl std::fmt::Display for IdSpaceExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player id space exhausted")
    }
}

impl std::error::Error for IdSpaceExhausted {}

/// Hands out the lowest player id not present in the persistent store.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    base: u32,
    limit: u32,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            base: PLAYER_ID_BASE,
            limit: u32::MAX,
        }
    }

    pub fn with_limit(base: u32, limit: u32) -> Self {
        Self { base, limit }
    }

    pub fn first_free(
        &self,
        used: &HashMap<CreatureId, String>,
    ) -> Result<CreatureId, IdSpaceExhausted> {
        for id in self.base..=self.limit {
            if !used.contains_key(&CreatureId(id)) {
                return Ok(CreatureId(id));
            }
        }
        Err(IdSpaceExhausted)
    }
}

/// The authoritative world. All mutation goes through the operations here;
/// each one gates on its before-chain, applies the change, fans the result
/// out to the players who can see it and notifies its after-chain.
pub struct Game {
    creatures: HashMap<CreatureId, Creature>,
    map: Map,
    channels: ChannelRegistry,
    clock: GameClock,
    db: Box<dyn Database + Send>,
    ids: IdGenerator,
    pub hooks: GameHooks,
}

impl Game {
    pub fn new(
        map: Map,
        channels: ChannelRegistry,
        clock: GameClock,
        db: Box<dyn Database + Send>,
    ) -> Self {
        Self {
            creatures: HashMap::new(),
            map,
            channels,
            clock,
            db,
            ids: IdGenerator::new(),
            hooks: GameHooks::default(),
        }
    }

    pub fn set_id_generator(&mut self, ids: IdGenerator) {
        self.ids = ids;
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn database_mut(&mut self) -> &mut (dyn Database + Send) {
        self.db.as_mut()
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    pub fn is_online(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(&id)
    }

    pub fn online_player_count(&self) -> usize {
        self.creatures.values().filter(|c| c.is_player()).count()
    }

    /// Places a creature in the world and on its tile.
    pub fn add_creature(&mut self, creature: Creature) {
        let id = creature.id;
        if let Some(tile) = self.map.tile_mut(creature.position) {
            tile.add_creature(id);
        }
        self.creatures.insert(id, creature);
        self.hooks
            .after_add_creature
            .notify(&CreatureEvent { creature: id });
    }

    /// Detaches a creature from its tile and the registry.
    pub fn remove_creature(&mut self, id: CreatureId) -> Option<Creature> {
        let creature = self.creatures.remove(&id)?;
        if let Some(tile) = self.map.tile_mut(creature.position) {
            tile.remove_creature(id);
        }
        self.hooks
            .after_remove_creature
            .notify(&CreatureEvent { creature: id });
        Some(creature)
    }

    /// The lowest character id not yet taken in the persistent store.
    pub fn generate_available_id(&mut self) -> Result<CreatureId, IdSpaceExhausted> {
        let used = self.db.player_id_name_dictionary();
        self.ids.first_free(&used)
    }

    /// Checks account credentials, disconnecting the caller on mismatch.
    pub fn check_account(
        &mut self,
        connection: &mut dyn Connection,
        name: &str,
        password: &str,
    ) -> Option<Account> {
        match self.db.get_account(name, password) {
            Some(account) => Some(account),
            None => {
                connection.send_disconnect("Account name or password incorrect.");
                connection.close();
                None
            }
        }
    }

    /// Brings a character into the world on an authenticated connection.
    /// The connection is consumed either way: it becomes the session on
    /// success and is closed with a reason on failure. The id comes back
    /// only when this connection became the session.
    pub fn process_login(
        &mut self,
        mut connection: Box<dyn Connection + Send>,
        account: &str,
        character: &str,
    ) -> Option<CreatureId> {
        let event = LoginEvent {
            character: character.to_string(),
        };
        if !self.hooks.before_login.allows(&event) {
            connection.send_disconnect("Login refused.");
            connection.close();
            return None;
        }
        let record = match self.db.get_player_by_name(account, character) {
            Ok(record) => record,
            Err(err) => {
                logging::log_error(&format!("login failed for {}: {}", character, err));
                connection.send_disconnect("Character could not be loaded.");
                connection.close();
                return None;
            }
        };
        if self.creatures.contains_key(&record.id) {
            connection.send_disconnect("You are already logged in.");
            connection.close();
            return None;
        }
        let spawn = record
            .saved_position
            .filter(|p| self.map.has_tile(*p))
            .unwrap_or(DEFAULT_SPAWN);
        if !self.map.has_tile(spawn) {
            connection.send_disconnect("The world has no room for you.");
            connection.close();
            return None;
        }

        let mut player = PlayerLocal::new(account.to_string(), connection);
        player.channel_list = record.channels.clone();
        player.saved_position = Some(spawn);
        let mut vip_states = Vec::with_capacity(record.vips.len());
        for vip in &record.vips {
            let logged_in = self.creatures.contains_key(&vip.id);
            player.vip_list.insert(
                vip.id,
                Vip {
                    id: vip.id,
                    name: vip.name.clone(),
                    logged_in,
                },
            );
            vip_states.push(ServerMessage::VipState {
                creature_id: vip.id,
                name: vip.name.clone(),
                logged_in,
            });
        }

        let id = record.id;
        self.add_creature(Creature {
            id,
            name: record.name.clone(),
            position: spawn,
            direction: Direction::South,
            health: record.health,
            max_health: record.max_health,
            outfit: record.outfit,
            kind: CreatureKind::Player(player),
        });

        self.send_to(id, &ServerMessage::LoginSuccess { creature_id: id });
        self.send_to(
            id,
            &ServerMessage::PlayerStatus {
                health: record.health,
                max_health: record.max_health,
            },
        );
        let channels: Vec<(ChannelId, String)> = record
            .channels
            .iter()
            .filter_map(|&cid| self.channels.get(cid).map(|c| (cid, c.name.clone())))
            .collect();
        self.send_to(id, &ServerMessage::ChannelList { channels });
        for message in vip_states {
            self.send_to(id, &message);
        }

        let health_percent = self
            .creatures
            .get(&id)
            .map(Creature::health_percent)
            .unwrap_or(0);
        let appear = ServerMessage::CreatureAppear {
            position: spawn,
            creature_id: id,
            name: record.name.clone(),
            direction: Direction::South,
            outfit: record.outfit,
            health_percent,
        };
        for pid in self.spectator_players(spawn) {
            if pid != id {
                self.send_to(pid, &appear);
            }
        }

        let holders: Vec<CreatureId> = self
            .creatures
            .values()
            .filter(|c| {
                c.player()
                    .map(|p| p.vip_list.contains_key(&id))
                    .unwrap_or(false)
            })
            .map(|c| c.id)
            .collect();
        for pid in holders {
            if let Some(player) = self.creatures.get_mut(&pid).and_then(Creature::player_mut) {
                if let Some(vip) = player.vip_list.get_mut(&id) {
                    vip.logged_in = true;
                }
            }
            self.send_to(pid, &ServerMessage::VipLogin { creature_id: id });
        }

        logging::log_game(&format!("{} logged in", record.name));
        self.hooks.after_login.notify(&CreatureEvent { creature: id });
        Some(id)
    }

    /// Takes a player out of the world, persisting the character as it
    /// stood at the moment of logout.
    pub fn player_logout(&mut self, id: CreatureId) {
        let event = LogoutEvent { player: id };
        if !self.hooks.before_logout.allows(&event) {
            return;
        }
        let Some(creature) = self.creatures.get(&id) else {
            return;
        };
        if !creature.is_player() {
            return;
        }
        let position = creature.position;
        let name = creature.name.clone();
        let record = self.player_record(id);
        let stack = self
            .map
            .tile(position)
            .and_then(|t| t.stack_position(id))
            .unwrap_or(1);

        let vanish = ServerMessage::TileRemoveThing {
            position,
            stack_position: stack,
        };
        for pid in self.spectator_players(position) {
            if pid != id {
                self.send_to(pid, &vanish);
            }
        }

        if let Some(mut creature) = self.remove_creature(id) {
            if let Some(player) = creature.player_mut() {
                player.connection.close();
            }
        }

        let holders: Vec<CreatureId> = self
            .creatures
            .values()
            .filter(|c| {
                c.player()
                    .map(|p| p.vip_list.contains_key(&id))
                    .unwrap_or(false)
            })
            .map(|c| c.id)
            .collect();
        for pid in holders {
            if let Some(player) = self.creatures.get_mut(&pid).and_then(Creature::player_mut) {
                if let Some(vip) = player.vip_list.get_mut(&id) {
                    vip.logged_in = false;
                }
            }
            self.send_to(pid, &ServerMessage::VipLogout { creature_id: id });
        }

        if let Some(record) = record {
            if let Err(err) = self.db.save_player_by_id(&record) {
                logging::log_error(&format!("save on logout failed for {}: {}", name, err));
            }
        }
        logging::log_game(&format!("{} logged out", name));
        self.hooks.after_logout.notify(&event);
    }

    /// Faces a creature toward `direction`, telling everyone who can see it.
    /// Facing the way it already faces is a silent no-op.
    pub fn creature_turn(&mut self, id: CreatureId, direction: Direction) {
        let event = TurnEvent {
            creature: id,
            direction,
        };
        if !self.hooks.before_creature_turn.allows(&event) {
            return;
        }
        let Some(creature) = self.creatures.get(&id) else {
            return;
        };
        if creature.direction != direction {
            let position = creature.position;
            let stack = self
                .map
                .tile(position)
                .and_then(|t| t.stack_position(id))
                .unwrap_or(1);
            if let Some(creature) = self.creatures.get_mut(&id) {
                creature.direction = direction;
            }
            let message = ServerMessage::CreatureTurn {
                position,
                stack_position: stack,
                creature_id: id,
                direction,
            };
            for pid in self.spectator_players(position) {
                self.send_to(pid, &message);
            }
        }
        self.hooks.after_creature_turn.notify(&event);
    }

    /// Walks a creature one step. The step is silently rejected when the
    /// destination is void, not walkable or off the coordinate space.
    ///
    /// Every player is told exactly what their viewport can justify: movers
    /// and players who see both tiles get the move, players who only see
    /// the origin get a removal, players who only see the destination get
    /// an appearance, everyone else hears nothing.
    pub fn creature_move(&mut self, id: CreatureId, direction: Direction) {
        let (from, name, outfit) = match self.creatures.get(&id) {
            Some(creature) => (creature.position, creature.name.clone(), creature.outfit),
            None => return,
        };
        let Some(to) = from.step(direction) else {
            return;
        };
        let Some(from_stack) = self.map.tile(from).and_then(|t| t.stack_position(id)) else {
            return;
        };
        let event = MoveEvent {
            creature: id,
            direction,
            from,
            to,
            from_stack_position: from_stack,
        };
        if !self.hooks.before_creature_move.allows(&event) {
            return;
        }
        if !self.map.tile(to).map(Tile::is_walkable).unwrap_or(false) {
            return;
        }

        if let Some(tile) = self.map.tile_mut(from) {
            tile.remove_creature(id);
        }
        if let Some(tile) = self.map.tile_mut(to) {
            tile.add_creature(id);
        }
        // Vertical component first, horizontal second; a diagonal step
        // therefore ends facing east or west.
        let mut facing = direction;
        if to.y < from.y {
            facing = Direction::North;
        } else if to.y > from.y {
            facing = Direction::South;
        }
        if to.x > from.x {
            facing = Direction::East;
        } else if to.x < from.x {
            facing = Direction::West;
        }
        let mut health_percent = 100;
        if let Some(creature) = self.creatures.get_mut(&id) {
            creature.position = to;
            creature.direction = facing;
            health_percent = creature.health_percent();
        }

        let moved = ServerMessage::CreatureMove {
            from,
            from_stack_position: from_stack,
            to,
        };
        let vanished = ServerMessage::TileRemoveThing {
            position: from,
            stack_position: from_stack,
        };
        let appeared = ServerMessage::CreatureAppear {
            position: to,
            creature_id: id,
            name,
            direction: facing,
            outfit,
            health_percent,
        };
        let mut outbound = Vec::new();
        for creature in self.creatures.values() {
            if !creature.is_player() {
                continue;
            }
            let pid = creature.id;
            if pid == id {
                outbound.push((pid, moved.clone()));
                continue;
            }
            match (
                creature.position.can_see(from),
                creature.position.can_see(to),
            ) {
                (true, true) => outbound.push((pid, moved.clone())),
                (true, false) => outbound.push((pid, vanished.clone())),
                (false, true) => outbound.push((pid, appeared.clone())),
                (false, false) => {}
            }
        }
        for (pid, message) in outbound {
            self.send_to(pid, &message);
        }
        self.hooks.after_creature_move.notify(&event);
    }

    /// Acknowledges a client-side walk abort with the facing the server
    /// believes in.
    pub fn player_cancel_walk(&mut self, id: CreatureId) {
        let event = WalkCancelEvent { player: id };
        if !self.hooks.before_walk_cancel.allows(&event) {
            return;
        }
        let Some(direction) = self
            .creatures
            .get(&id)
            .filter(|c| c.is_player())
            .map(|c| c.direction)
        else {
            return;
        };
        self.send_to(id, &ServerMessage::CancelWalk { direction });
        self.hooks.after_walk_cancel.notify(&event);
    }

    /// Describes whatever occupies `stack_position` on a tile the player
    /// can see. Tiles only carry creature identity, so looking at the
    /// ground or an item stays silent.
    pub fn player_look_at(&mut self, id: CreatureId, position: Position, stack_position: u8) {
        let Some(looker) = self.creatures.get(&id).filter(|c| c.is_player()) else {
            return;
        };
        if !looker.position.can_see(position) {
            return;
        }
        let Some(tile) = self.map.tile(position) else {
            return;
        };
        let target = tile
            .creatures
            .iter()
            .find(|&&cid| tile.stack_position(cid) == Some(stack_position))
            .and_then(|cid| self.creatures.get(cid));
        let Some(target) = target else {
            return;
        };
        let text = format!("You see {}.", target.name);
        self.send_to(
            id,
            &ServerMessage::TextMessage {
                kind: TextMessageKind::DescriptionGreen,
                text,
            },
        );
    }

    /// Swaps a player's outfit, shows it to everyone watching and writes it
    /// through to the store.
    pub fn player_change_outfit(&mut self, id: CreatureId, outfit: Outfit) {
        let event = OutfitEvent { player: id, outfit };
        if !self.hooks.before_player_change_outfit.allows(&event) {
            return;
        }
        let Some(creature) = self.creatures.get_mut(&id) else {
            return;
        };
        if !creature.is_player() {
            return;
        }
        creature.outfit = outfit;
        let position = creature.position;
        let message = ServerMessage::CreatureOutfit {
            creature_id: id,
            outfit,
        };
        for pid in self.spectator_players(position) {
            self.send_to(pid, &message);
        }
        if let Some(record) = self.player_record(id) {
            if let Err(err) = self.db.save_player_by_name(&record) {
                logging::log_error(&format!("outfit save failed for {}: {}", record.name, err));
            }
        }
        self.hooks.after_player_change_outfit.notify(&event);
    }

    /// Applies a new health value and reports the percentage to spectators.
    /// Players additionally get their exact numbers.
    pub fn creature_update_health(&mut self, id: CreatureId, health: u16) {
        let event = HealthEvent {
            creature: id,
            health,
        };
        if !self.hooks.before_creature_update_health.allows(&event) {
            return;
        }
        let Some(creature) = self.creatures.get_mut(&id) else {
            return;
        };
        creature.health = health.min(creature.max_health);
        let position = creature.position;
        let current = creature.health;
        let max_health = creature.max_health;
        let percent = creature.health_percent();
        let message = ServerMessage::CreatureHealth {
            creature_id: id,
            percent,
        };
        for pid in self.spectator_players(position) {
            self.send_to(pid, &message);
        }
        self.send_to(
            id,
            &ServerMessage::PlayerStatus {
                health: current,
                max_health,
            },
        );
        self.hooks.after_creature_update_health.notify(&event);
    }

    /// Routes one utterance by kind. The gate sits in front of the
    /// dispatch, so a veto silences every speech kind alike.
    pub fn creature_speech(&mut self, id: CreatureId, speech: Speech) {
        let event = SpeechEvent {
            creature: id,
            speech: speech.clone(),
        };
        if !self.hooks.before_creature_speech.allows(&event) {
            return;
        }
        match speech {
            Speech::Say(text) => self.say_speech(id, &text),
            Speech::Whisper(text) => self.whisper_speech(id, &text),
            Speech::Yell(text) => self.yell_speech(id, &text),
            Speech::Private { receiver, text } => self.private_speech(id, &receiver, &text),
            Speech::Channel { channel, text } => self.channel_speech(id, channel, &text),
        }
    }

    fn say_speech(&mut self, id: CreatureId, text: &str) {
        let Some(creature) = self.creatures.get(&id) else {
            return;
        };
        let position = creature.position;
        let sender = creature.name.clone();
        let message = ServerMessage::CreatureSpeech {
            sender: sender.clone(),
            speech: SpeechTo::Say {
                position,
                text: text.to_string(),
            },
        };
        for pid in self.spectator_players(position) {
            self.send_to(pid, &message);
        }
        logging::log_chat(&format!("{} says: {}", sender, text));
        self.hooks.after_say_speech.notify(&DefaultSpeechEvent {
            creature: id,
            text: text.to_string(),
        });
    }

    fn whisper_speech(&mut self, id: CreatureId, text: &str) {
        let Some(creature) = self.creatures.get(&id) else {
            return;
        };
        let position = creature.position;
        let sender = creature.name.clone();
        let mut outbound = Vec::new();
        for spectator in self.creatures.values() {
            if !spectator.is_player() || !spectator.position.can_see(position) {
                continue;
            }
            let heard = if spectator.position.is_in_range(position, true, WHISPER_RANGE) {
                text.to_string()
            } else {
                WHISPER_FILLER.to_string()
            };
            outbound.push((
                spectator.id,
                ServerMessage::CreatureSpeech {
                    sender: sender.clone(),
                    speech: SpeechTo::Whisper {
                        position,
                        text: heard,
                    },
                },
            ));
        }
        for (pid, message) in outbound {
            self.send_to(pid, &message);
        }
        logging::log_chat(&format!("{} whispers: {}", sender, text));
        self.hooks.after_whisper_speech.notify(&DefaultSpeechEvent {
            creature: id,
            text: text.to_string(),
        });
    }

    fn yell_speech(&mut self, id: CreatureId, text: &str) {
        let now = self.clock.now();
        let cooldown_ticks = self.clock.ticks_from_duration_round_up(YELL_COOLDOWN);
        let Some(creature) = self.creatures.get_mut(&id) else {
            return;
        };
        let position = creature.position;
        let sender = creature.name.clone();
        let mut exhausted = false;
        if let Some(player) = creature.player_mut() {
            match player.last_yell {
                Some(last) if now.0.saturating_sub(last.0) <= cooldown_ticks => exhausted = true,
                _ => player.last_yell = Some(now),
            }
        }
        if exhausted {
            self.send_status(id, "You are exhausted.");
            return;
        }

        // Surface yells carry across floors; underground ones stay on
        // their own floor.
        let same_floor = position.z > GROUND_FLOOR;
        let shouted = text.to_uppercase();
        let recipients: Vec<CreatureId> = self
            .creatures
            .values()
            .filter(|c| {
                c.is_player() && c.position.is_in_range(position, same_floor, YELL_RANGE)
            })
            .map(|c| c.id)
            .collect();
        let message = ServerMessage::CreatureSpeech {
            sender: sender.clone(),
            speech: SpeechTo::Yell {
                position,
                text: shouted,
            },
        };
        for pid in recipients {
            self.send_to(pid, &message);
        }
        logging::log_chat(&format!("{} yells: {}", sender, text));
        self.hooks.after_yell_speech.notify(&DefaultSpeechEvent {
            creature: id,
            text: text.to_string(),
        });
    }

    fn private_speech(&mut self, id: CreatureId, receiver: &str, text: &str) {
        let Some(sender) = self.creatures.get(&id).map(|c| c.name.clone()) else {
            return;
        };
        let target = self
            .creatures
            .values()
            .find(|c| c.is_player() && c.name == receiver)
            .map(|c| c.id);
        match target {
            Some(target_id) => {
                self.send_to(
                    target_id,
                    &ServerMessage::CreatureSpeech {
                        sender: sender.clone(),
                        speech: SpeechTo::Private {
                            text: text.to_string(),
                        },
                    },
                );
                self.send_status(id, &format!("Message sent to {}.", receiver));
                logging::log_chat(&format!("{} tells {}: {}", sender, receiver, text));
            }
            None => self.send_status(id, "A player with this name is not online."),
        }
        self.hooks.after_private_speech.notify(&PrivateSpeechEvent {
            creature: id,
            receiver: receiver.to_string(),
            text: text.to_string(),
        });
    }

    fn channel_speech(&mut self, id: CreatureId, channel: ChannelId, text: &str) {
        let Some(sender) = self.creatures.get(&id).map(|c| c.name.clone()) else {
            return;
        };
        if self.channels.get(channel).is_none() {
            return;
        }
        let message = ServerMessage::CreatureSpeech {
            sender: sender.clone(),
            speech: SpeechTo::Channel {
                channel,
                text: text.to_string(),
            },
        };
        let recipients: Vec<CreatureId> = self
            .creatures
            .values()
            .filter(|c| {
                c.player()
                    .map(|p| p.has_channel_open(channel))
                    .unwrap_or(false)
            })
            .map(|c| c.id)
            .collect();
        for pid in recipients {
            self.send_to(pid, &message);
        }
        logging::log_chat(&format!("[{}] {}: {}", channel.0, sender, text));
        self.hooks.after_channel_speech.notify(&ChannelSpeechEvent {
            sender,
            channel,
            text: text.to_string(),
        });
    }

    /// Opens a public channel for a player. Unknown channels and channels
    /// the account is not allowed into are ignored.
    pub fn channel_open(&mut self, id: CreatureId, channel: ChannelId) {
        let event = ChannelEvent {
            player: id,
            channel,
        };
        if !self.hooks.before_channel_open.allows(&event) {
            return;
        }
        let Some(name) = self.channels.get(channel).map(|c| c.name.clone()) else {
            return;
        };
        let Some(player) = self.creatures.get_mut(&id).and_then(Creature::player_mut) else {
            return;
        };
        if !player.may_use_channel(channel) {
            return;
        }
        player.opened_channels.insert(channel);
        self.send_to(id, &ServerMessage::ChannelOpen { id: channel, name });
        self.hooks.after_channel_open.notify(&event);
    }

    /// The client already closed its tab; the server only drops membership
    /// and tells observers about it.
    pub fn channel_close(&mut self, id: CreatureId, channel: ChannelId) {
        self.hooks.on_channel_close.notify(&ChannelEvent {
            player: id,
            channel,
        });
        if let Some(player) = self.creatures.get_mut(&id).and_then(Creature::player_mut) {
            player.opened_channels.remove(&channel);
        }
    }

    /// Opens a private conversation tab toward a character that exists in
    /// the store, online or not.
    pub fn private_channel_open(&mut self, id: CreatureId, receiver: &str) {
        let event = PrivateChannelEvent {
            player: id,
            receiver: receiver.to_string(),
        };
        if !self.hooks.before_private_channel_open.allows(&event) {
            return;
        }
        let resolved = self
            .db
            .player_id_name_dictionary()
            .into_values()
            .find(|name| name.eq_ignore_ascii_case(receiver));
        match resolved {
            Some(name) => {
                self.send_to(id, &ServerMessage::ChannelOpenPrivate { receiver: name });
                self.hooks.after_private_channel_open.notify(&event);
            }
            None => self.send_status(id, "A player with this name does not exist."),
        }
    }

    /// Adds a character to the player's VIP roster. Capacity is checked
    /// before the name is even resolved.
    pub fn vip_add(&mut self, id: CreatureId, name: &str) {
        let event = VipAddEvent {
            player: id,
            name: name.to_string(),
        };
        if !self.hooks.before_vip_add.allows(&event) {
            return;
        }
        let Some(player) = self.creatures.get(&id).and_then(Creature::player) else {
            return;
        };
        if player.vip_is_full() {
            self.send_status(id, "You cannot add more buddies.");
            return;
        }
        let resolved = self
            .db
            .player_id_name_dictionary()
            .into_iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name));
        let Some((vip_id, vip_name)) = resolved else {
            self.send_status(id, "A player with this name does not exist.");
            return;
        };
        let already = self
            .creatures
            .get(&id)
            .and_then(Creature::player)
            .map(|p| p.vip_list.contains_key(&vip_id))
            .unwrap_or(false);
        if already {
            self.send_status(id, "This player is already in your list.");
            return;
        }
        let logged_in = self.creatures.contains_key(&vip_id);
        if let Some(player) = self.creatures.get_mut(&id).and_then(Creature::player_mut) {
            player.vip_list.insert(
                vip_id,
                Vip {
                    id: vip_id,
                    name: vip_name.clone(),
                    logged_in,
                },
            );
        }
        self.send_to(
            id,
            &ServerMessage::VipState {
                creature_id: vip_id,
                name: vip_name,
                logged_in,
            },
        );
        self.hooks.after_vip_add.notify(&event);
    }

    /// Drops a VIP entry. The client removed its row already, so this only
    /// notifies observers and forgets the entry.
    pub fn vip_remove(&mut self, id: CreatureId, vip: CreatureId) {
        self.hooks
            .on_vip_remove
            .notify(&VipRemoveEvent { player: id, vip });
        if let Some(player) = self.creatures.get_mut(&id).and_then(Creature::player_mut) {
            player.vip_list.remove(&vip);
        }
    }

    fn send_to(&mut self, id: CreatureId, message: &ServerMessage) {
        if let Some(player) = self.creatures.get_mut(&id).and_then(Creature::player_mut) {
            player.connection.send(message);
        }
    }

    fn send_status(&mut self, id: CreatureId, text: &str) {
        self.send_to(
            id,
            &ServerMessage::TextMessage {
                kind: TextMessageKind::StatusSmall,
                text: text.to_string(),
            },
        );
    }

    /// Connected players whose viewport covers `location`.
    fn spectator_players(&self, location: Position) -> Vec<CreatureId> {
        self.creatures
            .values()
            .filter(|c| c.is_player() && c.position.can_see(location))
            .map(|c| c.id)
            .collect()
    }

    /// Snapshot of a player as the store wants it. Live-only state stays
    /// behind.
    fn player_record(&self, id: CreatureId) -> Option<PlayerRecord> {
        let creature = self.creatures.get(&id)?;
        let player = creature.player()?;
        let mut vips: Vec<VipRecord> = player
            .vip_list
            .values()
            .map(|vip| VipRecord {
                id: vip.id,
                name: vip.name.clone(),
            })
            .collect();
        vips.sort_by_key(|vip| vip.id);
        Some(PlayerRecord {
            id: creature.id,
            name: creature.name.clone(),
            account: player.account.clone(),
            health: creature.health,
            max_health: creature.max_health,
            outfit: creature.outfit,
            saved_position: Some(creature.position),
            channels: player.channel_list.clone(),
            vips,
        })
    }
}
