use crate::entities::creature::CreatureId;
use crate::net::connection::Connection;
use crate::world::channels::ChannelId;
use crate::world::position::Position;
use crate::world::time::GameTick;
use std::collections::{HashMap, HashSet};

/// Most VIP entries a single player may hold.
pub const VIP_LIST_CAPACITY: usize = 100;

/// One entry in a player's VIP roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vip {
    pub id: CreatureId,
    pub name: String,
    pub logged_in: bool,
}

/// Session state of a connected player. Owned by its `Creature` for exactly
/// the lifetime of the session; the connection binding is created at login
/// and torn down at logout.
pub struct PlayerLocal {
    pub account: String,
    pub connection: Box<dyn Connection + Send>,
    pub vip_list: HashMap<CreatureId, Vip>,
    /// Channels the account may join.
    pub channel_list: Vec<ChannelId>,
    /// Channels currently opened in the client.
    pub opened_channels: HashSet<ChannelId>,
    pub last_yell: Option<GameTick>,
    pub saved_position: Option<Position>,
}

impl std::fmt::Debug for PlayerLocal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerLocal")
            .field("account", &self.account)
            .field("vip_list", &self.vip_list.len())
            .field("channel_list", &self.channel_list)
            .field("opened_channels", &self.opened_channels)
            .field("last_yell", &self.last_yell)
            .field("saved_position", &self.saved_position)
            .finish()
    }
}

impl PlayerLocal {
    pub fn new(account: String, connection: Box<dyn Connection + Send>) -> Self {
        Self {
            account,
            connection,
            vip_list: HashMap::new(),
            channel_list: Vec::new(),
            opened_channels: HashSet::new(),
            last_yell: None,
            saved_position: None,
        }
    }

    pub fn may_use_channel(&self, id: ChannelId) -> bool {
        self.channel_list.contains(&id)
    }

    pub fn has_channel_open(&self, id: ChannelId) -> bool {
        self.opened_channels.contains(&id)
    }

    pub fn vip_is_full(&self) -> bool {
        self.vip_list.len() >= VIP_LIST_CAPACITY
    }
}
