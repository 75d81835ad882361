use crate::net::packet::PacketWriter;
use crate::net::protocol::ServerMessage;
use crate::telemetry::logging;
use std::io::Write;
use std::net::{Shutdown, TcpStream};

/// Outbound half of a client session. Sends are fire-and-forget: a failed
/// write marks the connection closed and is logged, it never propagates
/// into world-state mutation.
pub trait Connection {
    fn send(&mut self, message: &ServerMessage);

    fn send_disconnect(&mut self, reason: &str) {
        self.send(&ServerMessage::Disconnect {
            reason: reason.to_string(),
        });
    }

    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Frames an encoded message for the wire: u16 length prefix, then the
/// opcode-led payload.
pub fn frame_message(message: &ServerMessage) -> Vec<u8> {
    let payload = message.encode();
    let mut writer = PacketWriter::with_capacity(payload.len() + 2);
    writer.write_u16_le(payload.len().min(u16::MAX as usize) as u16);
    writer.write_bytes(&payload);
    writer.into_vec()
}

pub struct TcpConnection {
    stream: TcpStream,
    peer: String,
    closed: bool,
}

impl TcpConnection {
    pub fn new(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            stream,
            peer,
            closed: false,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Connection for TcpConnection {
    fn send(&mut self, message: &ServerMessage) {
        if self.closed {
            return;
        }
        let frame = frame_message(message);
        if let Err(err) = self.stream.write_all(&frame) {
            logging::log_net(&format!("send to {} failed: {}", self.peer, err));
            self.close();
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Connection that drops everything. Used for headless creatures in tools
/// and as a stand-in while a player record is manipulated offline.
#[derive(Debug, Default)]
pub struct NullConnection {
    closed: bool,
}

impl Connection for NullConnection {
    fn send(&mut self, _message: &ServerMessage) {}

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
