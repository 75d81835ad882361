use crate::entities::creature::{CreatureId, Outfit};
use crate::net::protocol::Speech;
use crate::world::channels::ChannelId;
use crate::world::position::{Direction, Position};

/// Ordered chain of cancellable pre-mutation gates. Every registered
/// handler is invoked, in registration order, even after one has denied;
/// the verdict is the AND over all of them. An empty chain always allows.
pub struct BeforeChain<E> {
    handlers: Vec<Box<dyn Fn(&E) -> bool + Send>>,
}

/// Ordered chain of notify-only observers, invoked in registration order
/// after the mutation went through. Observers cannot affect the outcome.
pub struct AfterChain<E> {
    handlers: Vec<Box<dyn Fn(&E) + Send>>,
}

impl<E> Default for BeforeChain<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> Default for AfterChain<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> BeforeChain<E> {
    pub fn register(&mut self, handler: impl Fn(&E) -> bool + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn allows(&self, event: &E) -> bool {
        let mut forward = true;
        for handler in &self.handlers {
            forward &= handler(event);
        }
        forward
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> AfterChain<E> {
    pub fn register(&mut self, handler: impl Fn(&E) + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn notify(&self, event: &E) {
        for handler in &self.handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatureEvent {
    pub creature: CreatureId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnEvent {
    pub creature: CreatureId,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutfitEvent {
    pub player: CreatureId,
    pub outfit: Outfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveEvent {
    pub creature: CreatureId,
    pub direction: Direction,
    pub from: Position,
    pub to: Position,
    pub from_stack_position: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub creature: CreatureId,
    pub speech: Speech,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSpeechEvent {
    pub creature: CreatureId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateSpeechEvent {
    pub creature: CreatureId,
    pub receiver: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpeechEvent {
    pub sender: String,
    pub channel: ChannelId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvent {
    pub player: CreatureId,
    pub channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateChannelEvent {
    pub player: CreatureId,
    pub receiver: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthEvent {
    pub creature: CreatureId,
    pub health: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipAddEvent {
    pub player: CreatureId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VipRemoveEvent {
    pub player: CreatureId,
    pub vip: CreatureId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub character: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutEvent {
    pub player: CreatureId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkCancelEvent {
    pub player: CreatureId,
}

/// The extension table of the game engine: one gate and/or notify chain per
/// mutating operation. Channel close and VIP remove happen client-side
/// first, so they only expose a notify chain.
#[derive(Default)]
pub struct GameHooks {
    pub after_add_creature: AfterChain<CreatureEvent>,
    pub after_remove_creature: AfterChain<CreatureEvent>,
    pub before_creature_turn: BeforeChain<TurnEvent>,
    pub after_creature_turn: AfterChain<TurnEvent>,
    pub before_player_change_outfit: BeforeChain<OutfitEvent>,
    pub after_player_change_outfit: AfterChain<OutfitEvent>,
    pub before_creature_move: BeforeChain<MoveEvent>,
    pub after_creature_move: AfterChain<MoveEvent>,
    pub before_creature_speech: BeforeChain<SpeechEvent>,
    pub after_say_speech: AfterChain<DefaultSpeechEvent>,
    pub after_whisper_speech: AfterChain<DefaultSpeechEvent>,
    pub after_yell_speech: AfterChain<DefaultSpeechEvent>,
    pub after_private_speech: AfterChain<PrivateSpeechEvent>,
    pub after_channel_speech: AfterChain<ChannelSpeechEvent>,
    pub before_channel_open: BeforeChain<ChannelEvent>,
    pub after_channel_open: AfterChain<ChannelEvent>,
    pub on_channel_close: AfterChain<ChannelEvent>,
    pub before_private_channel_open: BeforeChain<PrivateChannelEvent>,
    pub after_private_channel_open: AfterChain<PrivateChannelEvent>,
    pub before_creature_update_health: BeforeChain<HealthEvent>,
    pub after_creature_update_health: AfterChain<HealthEvent>,
    pub before_vip_add: BeforeChain<VipAddEvent>,
    pub after_vip_add: AfterChain<VipAddEvent>,
    pub on_vip_remove: AfterChain<VipRemoveEvent>,
    pub before_login: BeforeChain<LoginEvent>,
    pub after_login: AfterChain<CreatureEvent>,
    pub before_logout: BeforeChain<LogoutEvent>,
    pub after_logout: AfterChain<LogoutEvent>,
    pub before_walk_cancel: BeforeChain<WalkCancelEvent>,
    pub after_walk_cancel: AfterChain<WalkCancelEvent>,
}
