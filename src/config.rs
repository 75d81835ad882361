use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub game_bind_addr: String,
    pub world_name: String,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: otserv <data-root> [game_bind_addr]".to_string());
        }
        let root = Path::new(&args[1]).to_path_buf();
        let game_bind_addr = if args.len() > 2 {
            args[2].clone()
        } else {
            std::env::var("OTSERV_GAME_ADDR")
                .ok()
                .and_then(|value| {
                    let trimmed = value.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                })
                .unwrap_or_else(|| "0.0.0.0:7172".to_string())
        };
        let world_name =
            std::env::var("OTSERV_WORLD_NAME").unwrap_or_else(|_| "World".to_string());
        Ok(Self {
            root,
            game_bind_addr,
            world_name,
        })
    }
}
