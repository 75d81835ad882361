use crate::entities::creature::CreatureId;
use crate::persistence::database::{Account, Database, PlayerRecord};
use crate::telemetry::logging;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

const PLAYER_CACHE_CAPACITY: usize = 256;

/// File-backed save store: accounts in `save/accounts.yaml`, one YAML
/// document per character under `save/players/`. Recently loaded records
/// stay in an LRU cache; saves write through it.
pub struct SaveStore {
    root: PathBuf,
    accounts: HashMap<String, AccountRecord>,
    index: HashMap<CreatureId, String>,
    cache: LruCache<String, PlayerRecord>,
    stats: CacheStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    name: String,
    /// Lowercase hex SHA-1 digest of the password.
    password: String,
    #[serde(default)]
    premium: bool,
    #[serde(default)]
    characters: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountFile {
    accounts: Vec<AccountRecord>,
}

pub fn password_digest(password: &str) -> String {
    let digest = Sha1::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

impl SaveStore {
    pub fn open(root: &Path) -> Result<Self, String> {
        let mut store = Self {
            root: root.to_path_buf(),
            accounts: HashMap::new(),
            index: HashMap::new(),
            cache: LruCache::new(
                NonZeroUsize::new(PLAYER_CACHE_CAPACITY).expect("nonzero capacity"),
            ),
            stats: CacheStats::default(),
        };
        store.load_accounts()?;
        store.build_index()?;
        Ok(store)
    }

    pub fn cache_stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn player_count(&self) -> usize {
        self.index.len()
    }

    fn players_dir(&self) -> PathBuf {
        self.root.join("save").join("players")
    }

    fn player_path(&self, name: &str) -> PathBuf {
        self.players_dir().join(format!("{}.yaml", name.to_lowercase()))
    }

    fn load_accounts(&mut self) -> Result<(), String> {
        let path = self.root.join("save").join("accounts.yaml");
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(format!(
                    "account file read failed for {}: {}",
                    path.display(),
                    err
                ))
            }
        };
        let file: AccountFile = serde_yaml::from_str(&data)
            .map_err(|err| format!("invalid account yaml in {}: {}", path.display(), err))?;
        for record in file.accounts {
            self.accounts.insert(record.name.to_lowercase(), record);
        }
        Ok(())
    }

    fn build_index(&mut self) -> Result<(), String> {
        let dir = self.players_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(format!(
                    "player directory read failed for {}: {}",
                    dir.display(),
                    err
                ))
            }
        };
        for entry in entries {
            let entry = entry.map_err(|err| format!("player directory entry failed: {}", err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            match read_player_file(&path) {
                Ok(record) => {
                    self.index.insert(record.id, record.name.clone());
                }
                Err(err) => logging::log_error(&format!("skipping player save: {}", err)),
            }
        }
        Ok(())
    }

    fn write_player(&mut self, record: &PlayerRecord) -> Result<(), String> {
        let dir = self.players_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|err| format!("player directory create failed: {}", err))?;
        let path = self.player_path(&record.name);
        let data = serde_yaml::to_string(record)
            .map_err(|err| format!("player serialize failed for {}: {}", record.name, err))?;
        std::fs::write(&path, data)
            .map_err(|err| format!("player write failed for {}: {}", path.display(), err))?;
        self.index.insert(record.id, record.name.clone());
        self.cache.put(record.name.to_lowercase(), record.clone());
        Ok(())
    }
}

fn read_player_file(path: &Path) -> Result<PlayerRecord, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|err| format!("player read failed for {}: {}", path.display(), err))?;
    serde_yaml::from_str(&data)
        .map_err(|err| format!("invalid player yaml in {}: {}", path.display(), err))
}

impl Database for SaveStore {
    fn get_player_by_name(&mut self, account: &str, name: &str) -> Result<PlayerRecord, String> {
        let key = name.to_lowercase();
        if let Some(record) = self.cache.get(&key) {
            self.stats.hits += 1;
            return Ok(record.clone());
        }
        self.stats.misses += 1;
        let record = read_player_file(&self.player_path(name))?;
        if !account.is_empty() && !record.account.eq_ignore_ascii_case(account) {
            return Err(format!("character {} does not belong to account", name));
        }
        self.cache.put(key, record.clone());
        Ok(record)
    }

    fn save_player_by_id(&mut self, record: &PlayerRecord) -> Result<(), String> {
        self.write_player(record)
    }

    fn save_player_by_name(&mut self, record: &PlayerRecord) -> Result<(), String> {
        self.write_player(record)
    }

    fn get_account(&mut self, name: &str, password: &str) -> Option<Account> {
        let record = self.accounts.get(&name.to_lowercase())?;
        if record.password != password_digest(password) {
            return None;
        }
        Some(Account {
            name: record.name.clone(),
            premium: record.premium,
            characters: record.characters.clone(),
        })
    }

    fn player_id_name_dictionary(&mut self) -> HashMap<CreatureId, String> {
        self.index.clone()
    }
}
