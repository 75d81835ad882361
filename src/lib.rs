mod config;
pub mod entities;
pub mod game;
pub mod net;
pub mod persistence;
pub mod telemetry;
pub mod world;

pub use game::{Game, IdGenerator, IdSpaceExhausted};
pub use net::packet::{PacketReader, PacketWriter};
pub use net::protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use net::server::{run_game_server, GameServerConfig, ServerControl};

use std::sync::{Arc, Mutex};
use std::time::Duration;

const TICK_LENGTH: Duration = Duration::from_millis(50);

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;

    let map_path = config.root.join("map.yaml");
    let map = world::map::Map::load(&map_path)?;
    let channels_path = config.root.join("channels.yaml");
    let channels = if channels_path.is_file() {
        world::channels::ChannelRegistry::load(&channels_path)?
    } else {
        world::channels::ChannelRegistry::with_defaults()
    };
    let store = persistence::store::SaveStore::open(&config.root)?;

    println!("otserv: world '{}'", config.world_name);
    println!("- root: {}", config.root.display());
    println!("- map tiles: {}", map.tile_count());
    println!("- channels: {}", channels.len());
    println!("- characters: {}", store.player_count());
    telemetry::logging::log_game(&format!(
        "world '{}' loaded: tiles={}, channels={}, characters={}",
        config.world_name,
        map.tile_count(),
        channels.len(),
        store.player_count()
    ));

    let game = Arc::new(Mutex::new(Game::new(
        map,
        channels,
        world::time::GameClock::new(TICK_LENGTH),
        Box::new(store),
    )));
    let control = Arc::new(ServerControl::new());
    let server_config = GameServerConfig {
        bind_addr: config.game_bind_addr,
        ..GameServerConfig::default()
    };
    run_game_server(server_config, game, control)
}
