use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::entities::creature::CreatureId;
use crate::game::Game;
use crate::net::connection::TcpConnection;
use crate::net::protocol::ClientMessage;
use crate::telemetry::logging;

#[derive(Debug, Clone)]
pub struct GameServerConfig {
    pub bind_addr: String,
    pub max_packet: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for GameServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7172".to_string(),
            max_packet: 0x7fe,
            read_timeout: Duration::from_secs(15 * 60),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Cooperative stop flag shared by the accept loop, the ticker and the
/// per-connection threads.
#[derive(Debug, Default)]
pub struct ServerControl {
    stop: AtomicBool,
}

impl ServerControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }
}

/// Accepts game connections and serves them until shutdown. Each
/// connection gets its own reader thread; all of them funnel into the
/// one `Game` behind the mutex.
pub fn run_game_server(
    config: GameServerConfig,
    game: Arc<Mutex<Game>>,
    control: Arc<ServerControl>,
) -> Result<(), String> {
    let listener = TcpListener::bind(&config.bind_addr)
        .map_err(|err| format!("bind {} failed: {}", config.bind_addr, err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("game listener nonblocking failed: {}", err))?;

    logging::log_game(&format!("game server listening on {}", config.bind_addr));
    println!("otserv: game server listening on {}", config.bind_addr);

    let _ticker = spawn_ticker(Arc::clone(&game), Arc::clone(&control));

    while control.is_running() {
        match listener.accept() {
            Ok((stream, addr)) => {
                logging::log_net(&format!("game connection from {}", addr));
                let config = config.clone();
                let game = Arc::clone(&game);
                let control = Arc::clone(&control);
                thread::spawn(move || {
                    if let Err(err) = handle_game_connection(stream, &config, &game, &control) {
                        logging::log_error(&format!("game connection error: {}", err));
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                logging::log_error(&format!("game accept error: {}", err));
            }
        }
    }

    Ok(())
}

/// Advances the world clock by wall time, one tick granularity.
fn spawn_ticker(game: Arc<Mutex<Game>>, control: Arc<ServerControl>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let tick_length = game
            .lock()
            .map(|game| game.clock().tick_length())
            .unwrap_or_else(|_| Duration::from_millis(50));
        let tick_nanos = tick_length.as_nanos().max(1);
        let mut last = Instant::now();
        while control.is_running() {
            thread::sleep(tick_length);
            let elapsed = last.elapsed();
            let ticks = (elapsed.as_nanos() / tick_nanos) as u64;
            if ticks == 0 {
                continue;
            }
            last += Duration::from_nanos((ticks as u128 * tick_nanos).min(u64::MAX as u128) as u64);
            if let Ok(mut game) = game.lock() {
                game.clock_mut().advance(ticks);
            }
        }
    })
}

enum ReadOutcome {
    Packet(Vec<u8>),
    Timeout,
    Closed,
}

fn read_frame(stream: &mut TcpStream, max_len: usize) -> Result<ReadOutcome, String> {
    let mut header = [0u8; 2];
    match stream.read_exact(&mut header) {
        Ok(()) => {}
        Err(err)
            if err.kind() == std::io::ErrorKind::WouldBlock
                || err.kind() == std::io::ErrorKind::TimedOut =>
        {
            return Ok(ReadOutcome::Timeout)
        }
        Err(err)
            if err.kind() == std::io::ErrorKind::UnexpectedEof
                || err.kind() == std::io::ErrorKind::ConnectionReset =>
        {
            return Ok(ReadOutcome::Closed)
        }
        Err(err) => return Err(format!("frame header read failed: {}", err)),
    }
    let len = u16::from_le_bytes(header) as usize;
    if len == 0 {
        return Err("frame length is zero".to_string());
    }
    if len > max_len {
        return Err(format!("frame length {} exceeds max {}", len, max_len));
    }
    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .map_err(|err| format!("frame body read failed: {}", err))?;
    Ok(ReadOutcome::Packet(body))
}

fn handle_game_connection(
    mut stream: TcpStream,
    config: &GameServerConfig,
    game: &Arc<Mutex<Game>>,
    control: &Arc<ServerControl>,
) -> Result<(), String> {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    stream
        .set_read_timeout(Some(config.read_timeout))
        .map_err(|err| format!("read timeout set failed: {}", err))?;
    stream
        .set_write_timeout(Some(config.write_timeout))
        .map_err(|err| format!("write timeout set failed: {}", err))?;

    // The first frame has to be a login; everything else is a protocol
    // violation and drops the connection.
    let body = match read_frame(&mut stream, config.max_packet)? {
        ReadOutcome::Packet(body) => body,
        ReadOutcome::Timeout | ReadOutcome::Closed => return Ok(()),
    };
    let message = ClientMessage::decode(&body)
        .map_err(|err| format!("bad first packet from {}: {}", peer, err))?;
    let ClientMessage::Login {
        account,
        password,
        character,
    } = message
    else {
        return Err(format!("{} sent a packet before logging in", peer));
    };

    let write_half = stream
        .try_clone()
        .map_err(|err| format!("stream clone failed: {}", err))?;
    let mut connection = TcpConnection::new(write_half);
    let id = {
        let mut game = game.lock().map_err(|_| "game lock poisoned".to_string())?;
        if game
            .check_account(&mut connection, &account, &password)
            .is_none()
        {
            return Ok(());
        }
        game.process_login(Box::new(connection), &account, &character)
    };
    // No id means the login was refused and the connection already told
    // why; this socket never owns a session in that case.
    let Some(id) = id else {
        return Ok(());
    };

    let result = session_loop(&mut stream, config, game, control, id);
    if let Ok(mut game) = game.lock() {
        if game.is_online(id) {
            game.player_logout(id);
        }
    }
    result
}

fn session_loop(
    stream: &mut TcpStream,
    config: &GameServerConfig,
    game: &Arc<Mutex<Game>>,
    control: &Arc<ServerControl>,
    id: CreatureId,
) -> Result<(), String> {
    while control.is_running() {
        let body = match read_frame(stream, config.max_packet)? {
            ReadOutcome::Packet(body) => body,
            ReadOutcome::Timeout => continue,
            ReadOutcome::Closed => return Ok(()),
        };
        let message = match ClientMessage::decode(&body) {
            Ok(message) => message,
            Err(err) => {
                logging::log_net(&format!("dropping session {:?}: {}", id, err));
                return Ok(());
            }
        };
        let mut game = game.lock().map_err(|_| "game lock poisoned".to_string())?;
        dispatch(&mut game, id, message);
        if !game.is_online(id) {
            return Ok(());
        }
    }
    Ok(())
}

fn dispatch(game: &mut Game, id: CreatureId, message: ClientMessage) {
    match message {
        // A second login on a live session is ignored.
        ClientMessage::Login { .. } => {}
        ClientMessage::Logout => game.player_logout(id),
        ClientMessage::Move(direction) => game.creature_move(id, direction),
        ClientMessage::Turn(direction) => game.creature_turn(id, direction),
        ClientMessage::LookAt {
            position,
            stack_position,
            ..
        } => game.player_look_at(id, position, stack_position),
        ClientMessage::Speech(speech) => game.creature_speech(id, speech),
        ClientMessage::ChannelOpen(channel) => game.channel_open(id, channel),
        ClientMessage::ChannelClose(channel) => game.channel_close(id, channel),
        ClientMessage::PrivateChannelOpen { receiver } => {
            game.private_channel_open(id, &receiver)
        }
        ClientMessage::CancelMove => game.player_cancel_walk(id),
        ClientMessage::SetOutfit(outfit) => game.player_change_outfit(id, outfit),
        ClientMessage::VipAdd { name } => game.vip_add(id, &name),
        ClientMessage::VipRemove(vip) => game.vip_remove(id, vip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::creature::DEFAULT_OUTFIT;
    use crate::net::connection::NullConnection;
    use crate::persistence::database::{Account, InMemoryDatabase, PlayerRecord};
    use crate::world::channels::{ChannelId, ChannelRegistry};
    use crate::world::map::Map;
    use crate::world::position::{Direction, Position};
    use crate::world::tile::Tile;
    use crate::world::time::GameClock;
    use std::io::Write;

    fn seeded_game() -> Game {
        let mut map = Map::new();
        for x in 95..=105 {
            for y in 95..=105 {
                map.insert_tile(Tile::new(Position::new(x, y, 7), true));
            }
        }
        let mut db = InMemoryDatabase::new();
        db.insert_account(
            "secret",
            Account {
                name: "acc".to_string(),
                premium: false,
                characters: vec!["Alice".to_string()],
            },
        );
        db.insert_player(PlayerRecord {
            id: CreatureId(1),
            name: "Alice".to_string(),
            account: "acc".to_string(),
            health: 100,
            max_health: 100,
            outfit: DEFAULT_OUTFIT,
            saved_position: Some(Position::new(100, 100, 7)),
            channels: vec![ChannelId(0x09)],
            vips: Vec::new(),
        });
        Game::new(
            map,
            ChannelRegistry::with_defaults(),
            GameClock::new(Duration::from_millis(50)),
            Box::new(db),
        )
    }

    #[test]
    fn dispatch_routes_messages_into_the_game() {
        let mut game = seeded_game();
        let id = game
            .process_login(Box::new(NullConnection::default()), "acc", "Alice")
            .expect("alice online");

        dispatch(&mut game, id, ClientMessage::Move(Direction::East));
        assert_eq!(
            game.creature(id).expect("alice").position,
            Position::new(101, 100, 7)
        );

        dispatch(&mut game, id, ClientMessage::Turn(Direction::North));
        assert_eq!(game.creature(id).expect("alice").direction, Direction::North);

        dispatch(&mut game, id, ClientMessage::Logout);
        assert!(!game.is_online(id));
    }

    #[test]
    fn refused_duplicate_login_leaves_the_live_session_alone() {
        let game = Arc::new(Mutex::new(seeded_game()));
        let id = game
            .lock()
            .expect("lock")
            .process_login(Box::new(NullConnection::default()), "acc", "Alice")
            .expect("alice online");

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");

        let body = ClientMessage::Login {
            account: "acc".to_string(),
            password: "secret".to_string(),
            character: "Alice".to_string(),
        }
        .encode();
        let mut frame = (body.len() as u16).to_le_bytes().to_vec();
        frame.extend_from_slice(&body);
        client.write_all(&frame).expect("write");
        drop(client);

        let config = GameServerConfig::default();
        let control = Arc::new(ServerControl::new());
        handle_game_connection(server, &config, &game, &control).expect("handler");

        assert!(game.lock().expect("lock").is_online(id));
    }

    #[test]
    fn read_frame_honours_the_length_prefix() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");

        client.write_all(&[3, 0, 0xbe, 0x01, 0x02]).expect("write");
        match read_frame(&mut server, 0x7fe).expect("read") {
            ReadOutcome::Packet(body) => assert_eq!(body, vec![0xbe, 0x01, 0x02]),
            _ => panic!("expected a packet"),
        }

        drop(client);
        match read_frame(&mut server, 0x7fe).expect("read") {
            ReadOutcome::Closed => {}
            _ => panic!("expected closed"),
        }
    }

    #[test]
    fn read_frame_rejects_oversized_and_empty_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let mut client = TcpStream::connect(addr).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");

        client.write_all(&[0, 0]).expect("write");
        assert!(read_frame(&mut server, 0x7fe).is_err());

        let mut client = TcpStream::connect(addr).expect("connect");
        let (mut server, _) = listener.accept().expect("accept");
        client.write_all(&[0xff, 0xff]).expect("write");
        assert!(read_frame(&mut server, 0x7fe).is_err());
    }

    #[test]
    fn server_control_flips_once() {
        let control = ServerControl::new();
        assert!(control.is_running());
        control.request_shutdown();
        assert!(!control.is_running());
    }
}
