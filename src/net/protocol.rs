use crate::entities::creature::{CreatureId, Outfit};
use crate::net::packet::{PacketReader, PacketWriter};
use crate::world::channels::ChannelId;
use crate::world::position::{Direction, Position};

// Client -> server opcodes.
pub const CLIENT_LOGIN: u8 = 0x0a;
pub const CLIENT_LOGOUT: u8 = 0x14;
pub const CLIENT_MOVE_NORTH: u8 = 0x65;
pub const CLIENT_MOVE_EAST: u8 = 0x66;
pub const CLIENT_MOVE_SOUTH: u8 = 0x67;
pub const CLIENT_MOVE_WEST: u8 = 0x68;
pub const CLIENT_MOVE_NORTHEAST: u8 = 0x6a;
pub const CLIENT_MOVE_SOUTHEAST: u8 = 0x6b;
pub const CLIENT_MOVE_SOUTHWEST: u8 = 0x6c;
pub const CLIENT_MOVE_NORTHWEST: u8 = 0x6d;
pub const CLIENT_TURN_NORTH: u8 = 0x6f;
pub const CLIENT_TURN_EAST: u8 = 0x70;
pub const CLIENT_TURN_SOUTH: u8 = 0x71;
pub const CLIENT_TURN_WEST: u8 = 0x72;
pub const CLIENT_LOOK_AT: u8 = 0x8c;
pub const CLIENT_SPEECH: u8 = 0x96;
pub const CLIENT_CHANNEL_OPEN: u8 = 0x98;
pub const CLIENT_CHANNEL_CLOSE: u8 = 0x99;
pub const CLIENT_PRIVATE_CHANNEL_OPEN: u8 = 0x9a;
pub const CLIENT_CANCEL_MOVE: u8 = 0xbe;
pub const CLIENT_SET_OUTFIT: u8 = 0xd3;
pub const CLIENT_VIP_ADD: u8 = 0xdc;
pub const CLIENT_VIP_REMOVE: u8 = 0xdd;

// Server -> client opcodes.
pub const SERVER_LOGIN_SUCCESS: u8 = 0x0a;
pub const SERVER_DISCONNECT: u8 = 0x14;
pub const SERVER_CREATURE_APPEAR: u8 = 0x6a;
pub const SERVER_TILE_REMOVE_THING: u8 = 0x6c;
pub const SERVER_CREATURE_MOVE: u8 = 0x6d;
pub const SERVER_CREATURE_TURN: u8 = 0x6b;
pub const SERVER_CREATURE_HEALTH: u8 = 0x8c;
pub const SERVER_CREATURE_OUTFIT: u8 = 0x8e;
pub const SERVER_PLAYER_STATUS: u8 = 0xa0;
pub const SERVER_CREATURE_SPEECH: u8 = 0xaa;
pub const SERVER_CHANNEL_LIST: u8 = 0xab;
pub const SERVER_CHANNEL_OPEN: u8 = 0xac;
pub const SERVER_CHANNEL_OPEN_PRIVATE: u8 = 0xad;
pub const SERVER_TEXT_MESSAGE: u8 = 0xb4;
pub const SERVER_CANCEL_WALK: u8 = 0xb5;
pub const SERVER_VIP_STATE: u8 = 0xd2;
pub const SERVER_VIP_LOGIN: u8 = 0xd3;
pub const SERVER_VIP_LOGOUT: u8 = 0xd4;

// Speech kind codes shared by both directions.
const SPEECH_SAY: u8 = 0x01;
const SPEECH_WHISPER: u8 = 0x02;
const SPEECH_YELL: u8 = 0x03;
const SPEECH_PRIVATE: u8 = 0x04;
const SPEECH_CHANNEL: u8 = 0x05;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownOpcode(u8),
    Truncated { opcode: u8 },
    InvalidValue { opcode: u8, field: &'static str },
    TrailingBytes { opcode: u8 },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::EmptyMessage => write!(f, "empty message"),
            ProtocolError::UnknownOpcode(opcode) => {
                write!(f, "unknown opcode 0x{:02x}", opcode)
            }
            ProtocolError::Truncated { opcode } => {
                write!(f, "truncated payload for opcode 0x{:02x}", opcode)
            }
            ProtocolError::InvalidValue { opcode, field } => {
                write!(f, "invalid {} in opcode 0x{:02x}", field, opcode)
            }
            ProtocolError::TrailingBytes { opcode } => {
                write!(f, "trailing bytes after opcode 0x{:02x}", opcode)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// What a creature said and to whom, as carried by the client speech
/// message. The kind decides which extra field travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speech {
    Say(String),
    Whisper(String),
    Yell(String),
    Private { receiver: String, text: String },
    Channel { channel: ChannelId, text: String },
}

/// Server-side rendering of speech: positional kinds carry the speaker's
/// location so the client can place the text, channel speech carries the
/// channel id, private speech carries neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechTo {
    Say { position: Position, text: String },
    Whisper { position: Position, text: String },
    Yell { position: Position, text: String },
    Private { text: String },
    Channel { channel: ChannelId, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMessageKind {
    DescriptionGreen,
    StatusSmall,
}

impl TextMessageKind {
    fn wire_code(self) -> u8 {
        match self {
            TextMessageKind::DescriptionGreen => 0x13,
            TextMessageKind::StatusSmall => 0x17,
        }
    }

    fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0x13 => Some(TextMessageKind::DescriptionGreen),
            0x17 => Some(TextMessageKind::StatusSmall),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Login {
        account: String,
        password: String,
        character: String,
    },
    Logout,
    Move(Direction),
    Turn(Direction),
    LookAt {
        position: Position,
        thing_id: u16,
        stack_position: u8,
    },
    Speech(Speech),
    ChannelOpen(ChannelId),
    ChannelClose(ChannelId),
    PrivateChannelOpen {
        receiver: String,
    },
    CancelMove,
    SetOutfit(Outfit),
    VipAdd {
        name: String,
    },
    VipRemove(CreatureId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    LoginSuccess {
        creature_id: CreatureId,
    },
    Disconnect {
        reason: String,
    },
    ChannelList {
        channels: Vec<(ChannelId, String)>,
    },
    ChannelOpen {
        id: ChannelId,
        name: String,
    },
    ChannelOpenPrivate {
        receiver: String,
    },
    CreatureAppear {
        position: Position,
        creature_id: CreatureId,
        name: String,
        direction: Direction,
        outfit: Outfit,
        health_percent: u8,
    },
    TileRemoveThing {
        position: Position,
        stack_position: u8,
    },
    CreatureMove {
        from: Position,
        from_stack_position: u8,
        to: Position,
    },
    CreatureTurn {
        position: Position,
        stack_position: u8,
        creature_id: CreatureId,
        direction: Direction,
    },
    CreatureHealth {
        creature_id: CreatureId,
        percent: u8,
    },
    CreatureOutfit {
        creature_id: CreatureId,
        outfit: Outfit,
    },
    PlayerStatus {
        health: u16,
        max_health: u16,
    },
    CreatureSpeech {
        sender: String,
        speech: SpeechTo,
    },
    TextMessage {
        kind: TextMessageKind,
        text: String,
    },
    CancelWalk {
        direction: Direction,
    },
    VipState {
        creature_id: CreatureId,
        name: String,
        logged_in: bool,
    },
    VipLogin {
        creature_id: CreatureId,
    },
    VipLogout {
        creature_id: CreatureId,
    },
}

fn write_outfit(writer: &mut PacketWriter, outfit: Outfit) {
    writer.write_u16_le(outfit.look_type);
    writer.write_u8(outfit.head);
    writer.write_u8(outfit.body);
    writer.write_u8(outfit.legs);
    writer.write_u8(outfit.feet);
    writer.write_u8(outfit.addons);
    writer.write_u16_le(outfit.look_item);
}

fn read_outfit(reader: &mut PacketReader) -> Option<Outfit> {
    Some(Outfit {
        look_type: reader.read_u16_le()?,
        head: reader.read_u8()?,
        body: reader.read_u8()?,
        legs: reader.read_u8()?,
        feet: reader.read_u8()?,
        addons: reader.read_u8()?,
        look_item: reader.read_u16_le()?,
    })
}

impl ClientMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PacketWriter::with_capacity(16);
        match self {
            ClientMessage::Login {
                account,
                password,
                character,
            } => {
                writer.write_u8(CLIENT_LOGIN);
                writer.write_string(account);
                writer.write_string(password);
                writer.write_string(character);
            }
            ClientMessage::Logout => writer.write_u8(CLIENT_LOGOUT),
            ClientMessage::Move(direction) => writer.write_u8(move_opcode(*direction)),
            ClientMessage::Turn(direction) => writer.write_u8(turn_opcode(*direction)),
            ClientMessage::LookAt {
                position,
                thing_id,
                stack_position,
            } => {
                writer.write_u8(CLIENT_LOOK_AT);
                writer.write_position(*position);
                writer.write_u16_le(*thing_id);
                writer.write_u8(*stack_position);
            }
            ClientMessage::Speech(speech) => {
                writer.write_u8(CLIENT_SPEECH);
                match speech {
                    Speech::Say(text) => {
                        writer.write_u8(SPEECH_SAY);
                        writer.write_string(text);
                    }
                    Speech::Whisper(text) => {
                        writer.write_u8(SPEECH_WHISPER);
                        writer.write_string(text);
                    }
                    Speech::Yell(text) => {
                        writer.write_u8(SPEECH_YELL);
                        writer.write_string(text);
                    }
                    Speech::Private { receiver, text } => {
                        writer.write_u8(SPEECH_PRIVATE);
                        writer.write_string(receiver);
                        writer.write_string(text);
                    }
                    Speech::Channel { channel, text } => {
                        writer.write_u8(SPEECH_CHANNEL);
                        writer.write_u16_le(channel.0);
                        writer.write_string(text);
                    }
                }
            }
            ClientMessage::ChannelOpen(channel) => {
                writer.write_u8(CLIENT_CHANNEL_OPEN);
                writer.write_u16_le(channel.0);
            }
            ClientMessage::ChannelClose(channel) => {
                writer.write_u8(CLIENT_CHANNEL_CLOSE);
                writer.write_u16_le(channel.0);
            }
            ClientMessage::PrivateChannelOpen { receiver } => {
                writer.write_u8(CLIENT_PRIVATE_CHANNEL_OPEN);
                writer.write_string(receiver);
            }
            ClientMessage::CancelMove => writer.write_u8(CLIENT_CANCEL_MOVE),
            ClientMessage::SetOutfit(outfit) => {
                writer.write_u8(CLIENT_SET_OUTFIT);
                write_outfit(&mut writer, *outfit);
            }
            ClientMessage::VipAdd { name } => {
                writer.write_u8(CLIENT_VIP_ADD);
                writer.write_string(name);
            }
            ClientMessage::VipRemove(id) => {
                writer.write_u8(CLIENT_VIP_REMOVE);
                writer.write_u32_le(id.0);
            }
        }
        writer.into_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PacketReader::new(data);
        let opcode = reader.read_u8().ok_or(ProtocolError::EmptyMessage)?;
        let truncated = || ProtocolError::Truncated { opcode };
        let message = match opcode {
            CLIENT_LOGIN => ClientMessage::Login {
                account: reader.read_string().ok_or_else(truncated)?,
                password: reader.read_string().ok_or_else(truncated)?,
                character: reader.read_string().ok_or_else(truncated)?,
            },
            CLIENT_LOGOUT => ClientMessage::Logout,
            CLIENT_MOVE_NORTH => ClientMessage::Move(Direction::North),
            CLIENT_MOVE_EAST => ClientMessage::Move(Direction::East),
            CLIENT_MOVE_SOUTH => ClientMessage::Move(Direction::South),
            CLIENT_MOVE_WEST => ClientMessage::Move(Direction::West),
            CLIENT_MOVE_NORTHEAST => ClientMessage::Move(Direction::Northeast),
            CLIENT_MOVE_SOUTHEAST => ClientMessage::Move(Direction::Southeast),
            CLIENT_MOVE_SOUTHWEST => ClientMessage::Move(Direction::Southwest),
            CLIENT_MOVE_NORTHWEST => ClientMessage::Move(Direction::Northwest),
            CLIENT_TURN_NORTH => ClientMessage::Turn(Direction::North),
            CLIENT_TURN_EAST => ClientMessage::Turn(Direction::East),
            CLIENT_TURN_SOUTH => ClientMessage::Turn(Direction::South),
            CLIENT_TURN_WEST => ClientMessage::Turn(Direction::West),
            CLIENT_LOOK_AT => ClientMessage::LookAt {
                position: reader.read_position().ok_or_else(truncated)?,
                thing_id: reader.read_u16_le().ok_or_else(truncated)?,
                stack_position: reader.read_u8().ok_or_else(truncated)?,
            },
            CLIENT_SPEECH => {
                let kind = reader.read_u8().ok_or_else(truncated)?;
                let speech = match kind {
                    SPEECH_SAY => Speech::Say(reader.read_string().ok_or_else(truncated)?),
                    SPEECH_WHISPER => {
                        Speech::Whisper(reader.read_string().ok_or_else(truncated)?)
                    }
                    SPEECH_YELL => Speech::Yell(reader.read_string().ok_or_else(truncated)?),
                    SPEECH_PRIVATE => Speech::Private {
                        receiver: reader.read_string().ok_or_else(truncated)?,
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    SPEECH_CHANNEL => Speech::Channel {
                        channel: ChannelId(reader.read_u16_le().ok_or_else(truncated)?),
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    _ => {
                        return Err(ProtocolError::InvalidValue {
                            opcode,
                            field: "speech kind",
                        })
                    }
                };
                ClientMessage::Speech(speech)
            }
            CLIENT_CHANNEL_OPEN => {
                ClientMessage::ChannelOpen(ChannelId(reader.read_u16_le().ok_or_else(truncated)?))
            }
            CLIENT_CHANNEL_CLOSE => {
                ClientMessage::ChannelClose(ChannelId(reader.read_u16_le().ok_or_else(truncated)?))
            }
            CLIENT_PRIVATE_CHANNEL_OPEN => ClientMessage::PrivateChannelOpen {
                receiver: reader.read_string().ok_or_else(truncated)?,
            },
            CLIENT_CANCEL_MOVE => ClientMessage::CancelMove,
            CLIENT_SET_OUTFIT => {
                ClientMessage::SetOutfit(read_outfit(&mut reader).ok_or_else(truncated)?)
            }
            CLIENT_VIP_ADD => ClientMessage::VipAdd {
                name: reader.read_string().ok_or_else(truncated)?,
            },
            CLIENT_VIP_REMOVE => {
                ClientMessage::VipRemove(CreatureId(reader.read_u32_le().ok_or_else(truncated)?))
            }
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        if reader.remaining() != 0 {
            return Err(ProtocolError::TrailingBytes { opcode });
        }
        Ok(message)
    }
}

fn move_opcode(direction: Direction) -> u8 {
    match direction {
        Direction::North => CLIENT_MOVE_NORTH,
        Direction::East => CLIENT_MOVE_EAST,
        Direction::South => CLIENT_MOVE_SOUTH,
        Direction::West => CLIENT_MOVE_WEST,
        Direction::Northeast => CLIENT_MOVE_NORTHEAST,
        Direction::Southeast => CLIENT_MOVE_SOUTHEAST,
        Direction::Southwest => CLIENT_MOVE_SOUTHWEST,
        Direction::Northwest => CLIENT_MOVE_NORTHWEST,
    }
}

// Clients can only face cardinal directions; diagonal turns collapse onto
// their horizontal component.
fn turn_opcode(direction: Direction) -> u8 {
    match direction {
        Direction::North => CLIENT_TURN_NORTH,
        Direction::East | Direction::Northeast | Direction::Southeast => CLIENT_TURN_EAST,
        Direction::South => CLIENT_TURN_SOUTH,
        Direction::West | Direction::Northwest | Direction::Southwest => CLIENT_TURN_WEST,
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = PacketWriter::with_capacity(16);
        match self {
            ServerMessage::LoginSuccess { creature_id } => {
                writer.write_u8(SERVER_LOGIN_SUCCESS);
                writer.write_u32_le(creature_id.0);
            }
            ServerMessage::Disconnect { reason } => {
                writer.write_u8(SERVER_DISCONNECT);
                writer.write_string(reason);
            }
            ServerMessage::ChannelList { channels } => {
                writer.write_u8(SERVER_CHANNEL_LIST);
                writer.write_u8(channels.len().min(u8::MAX as usize) as u8);
                for (id, name) in channels.iter().take(u8::MAX as usize) {
                    writer.write_u16_le(id.0);
                    writer.write_string(name);
                }
            }
            ServerMessage::ChannelOpen { id, name } => {
                writer.write_u8(SERVER_CHANNEL_OPEN);
                writer.write_u16_le(id.0);
                writer.write_string(name);
            }
            ServerMessage::ChannelOpenPrivate { receiver } => {
                writer.write_u8(SERVER_CHANNEL_OPEN_PRIVATE);
                writer.write_string(receiver);
            }
            ServerMessage::CreatureAppear {
                position,
                creature_id,
                name,
                direction,
                outfit,
                health_percent,
            } => {
                writer.write_u8(SERVER_CREATURE_APPEAR);
                writer.write_position(*position);
                writer.write_u32_le(creature_id.0);
                writer.write_string(name);
                writer.write_u8(direction.wire_code());
                write_outfit(&mut writer, *outfit);
                writer.write_u8(*health_percent);
            }
            ServerMessage::TileRemoveThing {
                position,
                stack_position,
            } => {
                writer.write_u8(SERVER_TILE_REMOVE_THING);
                writer.write_position(*position);
                writer.write_u8(*stack_position);
            }
            ServerMessage::CreatureMove {
                from,
                from_stack_position,
                to,
            } => {
                writer.write_u8(SERVER_CREATURE_MOVE);
                writer.write_position(*from);
                writer.write_u8(*from_stack_position);
                writer.write_position(*to);
            }
            ServerMessage::CreatureTurn {
                position,
                stack_position,
                creature_id,
                direction,
            } => {
                writer.write_u8(SERVER_CREATURE_TURN);
                writer.write_position(*position);
                writer.write_u8(*stack_position);
                writer.write_u32_le(creature_id.0);
                writer.write_u8(direction.wire_code());
            }
            ServerMessage::CreatureHealth {
                creature_id,
                percent,
            } => {
                writer.write_u8(SERVER_CREATURE_HEALTH);
                writer.write_u32_le(creature_id.0);
                writer.write_u8(*percent);
            }
            ServerMessage::CreatureOutfit {
                creature_id,
                outfit,
            } => {
                writer.write_u8(SERVER_CREATURE_OUTFIT);
                writer.write_u32_le(creature_id.0);
                write_outfit(&mut writer, *outfit);
            }
            ServerMessage::PlayerStatus { health, max_health } => {
                writer.write_u8(SERVER_PLAYER_STATUS);
                writer.write_u16_le(*health);
                writer.write_u16_le(*max_health);
            }
            ServerMessage::CreatureSpeech { sender, speech } => {
                writer.write_u8(SERVER_CREATURE_SPEECH);
                writer.write_string(sender);
                match speech {
                    SpeechTo::Say { position, text } => {
                        writer.write_u8(SPEECH_SAY);
                        writer.write_position(*position);
                        writer.write_string(text);
                    }
                    SpeechTo::Whisper { position, text } => {
                        writer.write_u8(SPEECH_WHISPER);
                        writer.write_position(*position);
                        writer.write_string(text);
                    }
                    SpeechTo::Yell { position, text } => {
                        writer.write_u8(SPEECH_YELL);
                        writer.write_position(*position);
                        writer.write_string(text);
                    }
                    SpeechTo::Private { text } => {
                        writer.write_u8(SPEECH_PRIVATE);
                        writer.write_string(text);
                    }
                    SpeechTo::Channel { channel, text } => {
                        writer.write_u8(SPEECH_CHANNEL);
                        writer.write_u16_le(channel.0);
                        writer.write_string(text);
                    }
                }
            }
            ServerMessage::TextMessage { kind, text } => {
                writer.write_u8(SERVER_TEXT_MESSAGE);
                writer.write_u8(kind.wire_code());
                writer.write_string(text);
            }
            ServerMessage::CancelWalk { direction } => {
                writer.write_u8(SERVER_CANCEL_WALK);
                writer.write_u8(direction.wire_code());
            }
            ServerMessage::VipState {
                creature_id,
                name,
                logged_in,
            } => {
                writer.write_u8(SERVER_VIP_STATE);
                writer.write_u32_le(creature_id.0);
                writer.write_string(name);
                writer.write_u8(u8::from(*logged_in));
            }
            ServerMessage::VipLogin { creature_id } => {
                writer.write_u8(SERVER_VIP_LOGIN);
                writer.write_u32_le(creature_id.0);
            }
            ServerMessage::VipLogout { creature_id } => {
                writer.write_u8(SERVER_VIP_LOGOUT);
                writer.write_u32_le(creature_id.0);
            }
        }
        writer.into_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = PacketReader::new(data);
        let opcode = reader.read_u8().ok_or(ProtocolError::EmptyMessage)?;
        let truncated = || ProtocolError::Truncated { opcode };
        let message = match opcode {
            SERVER_LOGIN_SUCCESS => ServerMessage::LoginSuccess {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
            },
            SERVER_DISCONNECT => ServerMessage::Disconnect {
                reason: reader.read_string().ok_or_else(truncated)?,
            },
            SERVER_CHANNEL_LIST => {
                let count = reader.read_u8().ok_or_else(truncated)?;
                let mut channels = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    let id = ChannelId(reader.read_u16_le().ok_or_else(truncated)?);
                    let name = reader.read_string().ok_or_else(truncated)?;
                    channels.push((id, name));
                }
                ServerMessage::ChannelList { channels }
            }
            SERVER_CHANNEL_OPEN => ServerMessage::ChannelOpen {
                id: ChannelId(reader.read_u16_le().ok_or_else(truncated)?),
                name: reader.read_string().ok_or_else(truncated)?,
            },
            SERVER_CHANNEL_OPEN_PRIVATE => ServerMessage::ChannelOpenPrivate {
                receiver: reader.read_string().ok_or_else(truncated)?,
            },
            SERVER_CREATURE_APPEAR => ServerMessage::CreatureAppear {
                position: reader.read_position().ok_or_else(truncated)?,
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
                name: reader.read_string().ok_or_else(truncated)?,
                direction: Direction::from_wire_code(reader.read_u8().ok_or_else(truncated)?)
                    .ok_or(ProtocolError::InvalidValue {
                        opcode,
                        field: "direction",
                    })?,
                outfit: read_outfit(&mut reader).ok_or_else(truncated)?,
                health_percent: reader.read_u8().ok_or_else(truncated)?,
            },
            SERVER_TILE_REMOVE_THING => ServerMessage::TileRemoveThing {
                position: reader.read_position().ok_or_else(truncated)?,
                stack_position: reader.read_u8().ok_or_else(truncated)?,
            },
            SERVER_CREATURE_MOVE => ServerMessage::CreatureMove {
                from: reader.read_position().ok_or_else(truncated)?,
                from_stack_position: reader.read_u8().ok_or_else(truncated)?,
                to: reader.read_position().ok_or_else(truncated)?,
            },
            SERVER_CREATURE_TURN => ServerMessage::CreatureTurn {
                position: reader.read_position().ok_or_else(truncated)?,
                stack_position: reader.read_u8().ok_or_else(truncated)?,
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
                direction: Direction::from_wire_code(reader.read_u8().ok_or_else(truncated)?)
                    .ok_or(ProtocolError::InvalidValue {
                        opcode,
                        field: "direction",
                    })?,
            },
            SERVER_CREATURE_HEALTH => ServerMessage::CreatureHealth {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
                percent: reader.read_u8().ok_or_else(truncated)?,
            },
            SERVER_CREATURE_OUTFIT => ServerMessage::CreatureOutfit {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
                outfit: read_outfit(&mut reader).ok_or_else(truncated)?,
            },
            SERVER_PLAYER_STATUS => ServerMessage::PlayerStatus {
                health: reader.read_u16_le().ok_or_else(truncated)?,
                max_health: reader.read_u16_le().ok_or_else(truncated)?,
            },
            SERVER_CREATURE_SPEECH => {
                let sender = reader.read_string().ok_or_else(truncated)?;
                let kind = reader.read_u8().ok_or_else(truncated)?;
                let speech = match kind {
                    SPEECH_SAY => SpeechTo::Say {
                        position: reader.read_position().ok_or_else(truncated)?,
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    SPEECH_WHISPER => SpeechTo::Whisper {
                        position: reader.read_position().ok_or_else(truncated)?,
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    SPEECH_YELL => SpeechTo::Yell {
                        position: reader.read_position().ok_or_else(truncated)?,
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    SPEECH_PRIVATE => SpeechTo::Private {
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    SPEECH_CHANNEL => SpeechTo::Channel {
                        channel: ChannelId(reader.read_u16_le().ok_or_else(truncated)?),
                        text: reader.read_string().ok_or_else(truncated)?,
                    },
                    _ => {
                        return Err(ProtocolError::InvalidValue {
                            opcode,
                            field: "speech kind",
                        })
                    }
                };
                ServerMessage::CreatureSpeech { sender, speech }
            }
            SERVER_TEXT_MESSAGE => ServerMessage::TextMessage {
                kind: TextMessageKind::from_wire_code(reader.read_u8().ok_or_else(truncated)?)
                    .ok_or(ProtocolError::InvalidValue {
                        opcode,
                        field: "message kind",
                    })?,
                text: reader.read_string().ok_or_else(truncated)?,
            },
            SERVER_CANCEL_WALK => ServerMessage::CancelWalk {
                direction: Direction::from_wire_code(reader.read_u8().ok_or_else(truncated)?)
                    .ok_or(ProtocolError::InvalidValue {
                        opcode,
                        field: "direction",
                    })?,
            },
            SERVER_VIP_STATE => ServerMessage::VipState {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
                name: reader.read_string().ok_or_else(truncated)?,
                logged_in: reader.read_u8().ok_or_else(truncated)? != 0,
            },
            SERVER_VIP_LOGIN => ServerMessage::VipLogin {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
            },
            SERVER_VIP_LOGOUT => ServerMessage::VipLogout {
                creature_id: CreatureId(reader.read_u32_le().ok_or_else(truncated)?),
            },
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        if reader.remaining() != 0 {
            return Err(ProtocolError::TrailingBytes { opcode });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::creature::DEFAULT_OUTFIT;

    fn sample_outfit() -> Outfit {
        Outfit {
            look_type: 130,
            head: 10,
            body: 20,
            legs: 30,
            feet: 40,
            addons: 1,
            look_item: 0,
        }
    }

    #[test]
    fn client_messages_roundtrip() {
        let messages = vec![
            ClientMessage::Login {
                account: "acc".to_string(),
                password: "secret".to_string(),
                character: "Alice".to_string(),
            },
            ClientMessage::Logout,
            ClientMessage::Move(Direction::North),
            ClientMessage::Move(Direction::Southwest),
            ClientMessage::Turn(Direction::East),
            ClientMessage::LookAt {
                position: Position::new(100, 205, 7),
                thing_id: 0,
                stack_position: 2,
            },
            ClientMessage::Speech(Speech::Say("hi".to_string())),
            ClientMessage::Speech(Speech::Whisper("psst".to_string())),
            ClientMessage::Speech(Speech::Yell("help".to_string())),
            ClientMessage::Speech(Speech::Private {
                receiver: "Bob".to_string(),
                text: "hello".to_string(),
            }),
            ClientMessage::Speech(Speech::Channel {
                channel: ChannelId(9),
                text: "anyone?".to_string(),
            }),
            ClientMessage::ChannelOpen(ChannelId(4)),
            ClientMessage::ChannelClose(ChannelId(4)),
            ClientMessage::PrivateChannelOpen {
                receiver: "Bob".to_string(),
            },
            ClientMessage::CancelMove,
            ClientMessage::SetOutfit(sample_outfit()),
            ClientMessage::VipAdd {
                name: "Bob".to_string(),
            },
            ClientMessage::VipRemove(CreatureId(0x40000001)),
        ];
        for message in messages {
            let bytes = message.encode();
            let decoded = ClientMessage::decode(&bytes).expect("decode");
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn server_messages_roundtrip() {
        let position = Position::new(100, 205, 7);
        let messages = vec![
            ServerMessage::LoginSuccess {
                creature_id: CreatureId(0x40000001),
            },
            ServerMessage::Disconnect {
                reason: "Account name or password incorrect.".to_string(),
            },
            ServerMessage::ChannelList {
                channels: vec![
                    (ChannelId(4), "Game-Chat".to_string()),
                    (ChannelId(9), "Help".to_string()),
                ],
            },
            ServerMessage::ChannelOpen {
                id: ChannelId(9),
                name: "Help".to_string(),
            },
            ServerMessage::ChannelOpenPrivate {
                receiver: "Bob".to_string(),
            },
            ServerMessage::CreatureAppear {
                position,
                creature_id: CreatureId(7),
                name: "Alice".to_string(),
                direction: Direction::South,
                outfit: sample_outfit(),
                health_percent: 80,
            },
            ServerMessage::TileRemoveThing {
                position,
                stack_position: 1,
            },
            ServerMessage::CreatureMove {
                from: position,
                from_stack_position: 1,
                to: Position::new(101, 205, 7),
            },
            ServerMessage::CreatureTurn {
                position,
                stack_position: 1,
                creature_id: CreatureId(7),
                direction: Direction::West,
            },
            ServerMessage::CreatureHealth {
                creature_id: CreatureId(7),
                percent: 55,
            },
            ServerMessage::CreatureOutfit {
                creature_id: CreatureId(7),
                outfit: DEFAULT_OUTFIT,
            },
            ServerMessage::PlayerStatus {
                health: 150,
                max_health: 200,
            },
            ServerMessage::CreatureSpeech {
                sender: "Alice".to_string(),
                speech: SpeechTo::Say {
                    position,
                    text: "hi".to_string(),
                },
            },
            ServerMessage::CreatureSpeech {
                sender: "Alice".to_string(),
                speech: SpeechTo::Yell {
                    position,
                    text: "HELP".to_string(),
                },
            },
            ServerMessage::CreatureSpeech {
                sender: "Alice".to_string(),
                speech: SpeechTo::Private {
                    text: "hello".to_string(),
                },
            },
            ServerMessage::CreatureSpeech {
                sender: "Alice".to_string(),
                speech: SpeechTo::Channel {
                    channel: ChannelId(9),
                    text: "anyone?".to_string(),
                },
            },
            ServerMessage::TextMessage {
                kind: TextMessageKind::StatusSmall,
                text: "You are exhausted.".to_string(),
            },
            ServerMessage::CancelWalk {
                direction: Direction::North,
            },
            ServerMessage::VipState {
                creature_id: CreatureId(7),
                name: "Bob".to_string(),
                logged_in: true,
            },
            ServerMessage::VipLogin {
                creature_id: CreatureId(7),
            },
            ServerMessage::VipLogout {
                creature_id: CreatureId(7),
            },
        ];
        for message in messages {
            let bytes = message.encode();
            let decoded = ServerMessage::decode(&bytes).expect("decode");
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn truncated_payload_is_a_protocol_error() {
        let bytes = ClientMessage::Login {
            account: "acc".to_string(),
            password: "secret".to_string(),
            character: "Alice".to_string(),
        }
        .encode();
        for len in 1..bytes.len() {
            let err = ClientMessage::decode(&bytes[..len]).expect_err("must fail");
            assert_eq!(err, ProtocolError::Truncated { opcode: CLIENT_LOGIN });
        }
    }

    #[test]
    fn unknown_opcode_is_a_protocol_error() {
        assert_eq!(
            ClientMessage::decode(&[0xff]),
            Err(ProtocolError::UnknownOpcode(0xff))
        );
        assert_eq!(
            ServerMessage::decode(&[0x01]),
            Err(ProtocolError::UnknownOpcode(0x01))
        );
        assert_eq!(ClientMessage::decode(&[]), Err(ProtocolError::EmptyMessage));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = ClientMessage::Logout.encode();
        bytes.push(0x00);
        assert_eq!(
            ClientMessage::decode(&bytes),
            Err(ProtocolError::TrailingBytes {
                opcode: CLIENT_LOGOUT
            })
        );
    }

    #[test]
    fn invalid_speech_kind_is_rejected() {
        let bytes = vec![CLIENT_SPEECH, 0x42, 0x00, 0x00];
        assert_eq!(
            ClientMessage::decode(&bytes),
            Err(ProtocolError::InvalidValue {
                opcode: CLIENT_SPEECH,
                field: "speech kind",
            })
        );
    }
}
