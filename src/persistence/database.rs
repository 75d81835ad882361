use crate::entities::creature::{CreatureId, Outfit};
use crate::world::channels::ChannelId;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An authenticated account and the characters it may play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub premium: bool,
    pub characters: Vec<String>,
}

/// Persistent state of a character, as stored between sessions. The live
/// session state (connection, opened channels) is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: CreatureId,
    pub name: String,
    pub account: String,
    pub health: u16,
    pub max_health: u16,
    pub outfit: Outfit,
    pub saved_position: Option<Position>,
    pub channels: Vec<ChannelId>,
    #[serde(default)]
    pub vips: Vec<VipRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipRecord {
    pub id: CreatureId,
    pub name: String,
}

/// Storage collaborator of the game engine. The engine never touches files
/// or SQL itself; everything it needs from storage goes through here.
pub trait Database {
    fn get_player_by_name(&mut self, account: &str, name: &str) -> Result<PlayerRecord, String>;

    fn save_player_by_id(&mut self, record: &PlayerRecord) -> Result<(), String>;

    fn save_player_by_name(&mut self, record: &PlayerRecord) -> Result<(), String>;

    fn get_account(&mut self, name: &str, password: &str) -> Option<Account>;

    /// Every known character id with its name, online or not. Drives VIP
    /// resolution and id generation.
    fn player_id_name_dictionary(&mut self) -> HashMap<CreatureId, String>;
}

/// Map-backed database used by tests and offline tooling.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    pub players: HashMap<String, PlayerRecord>,
    pub accounts: HashMap<String, (String, Account)>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_player(&mut self, record: PlayerRecord) {
        self.players.insert(record.name.to_lowercase(), record);
    }

    pub fn insert_account(&mut self, password: &str, account: Account) {
        self.accounts.insert(
            account.name.to_lowercase(),
            (password.to_string(), account),
        );
    }
}

impl Database for InMemoryDatabase {
    fn get_player_by_name(&mut self, _account: &str, name: &str) -> Result<PlayerRecord, String> {
        self.players
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| format!("no such character: {}", name))
    }

    fn save_player_by_id(&mut self, record: &PlayerRecord) -> Result<(), String> {
        self.insert_player(record.clone());
        Ok(())
    }

    fn save_player_by_name(&mut self, record: &PlayerRecord) -> Result<(), String> {
        self.insert_player(record.clone());
        Ok(())
    }

    fn get_account(&mut self, name: &str, password: &str) -> Option<Account> {
        let (stored, account) = self.accounts.get(&name.to_lowercase())?;
        if stored == password {
            Some(account.clone())
        } else {
            None
        }
    }

    fn player_id_name_dictionary(&mut self) -> HashMap<CreatureId, String> {
        self.players
            .values()
            .map(|record| (record.id, record.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::creature::DEFAULT_OUTFIT;

    fn record(id: u32, name: &str) -> PlayerRecord {
        PlayerRecord {
            id: CreatureId(id),
            name: name.to_string(),
            account: "acc".to_string(),
            health: 100,
            max_health: 100,
            outfit: DEFAULT_OUTFIT,
            saved_position: None,
            channels: vec![ChannelId(9)],
            vips: Vec::new(),
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut db = InMemoryDatabase::new();
        db.insert_player(record(1, "Alice"));
        assert!(db.get_player_by_name("acc", "alice").is_ok());
        assert!(db.get_player_by_name("acc", "ALICE").is_ok());
        assert!(db.get_player_by_name("acc", "Bob").is_err());
    }

    #[test]
    fn dictionary_lists_all_characters() {
        let mut db = InMemoryDatabase::new();
        db.insert_player(record(1, "Alice"));
        db.insert_player(record(2, "Bob"));
        let dictionary = db.player_id_name_dictionary();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get(&CreatureId(2)).map(String::as_str), Some("Bob"));
    }

    #[test]
    fn account_password_must_match() {
        let mut db = InMemoryDatabase::new();
        db.insert_account(
            "secret",
            Account {
                name: "acc".to_string(),
                premium: false,
                characters: vec!["Alice".to_string()],
            },
        );
        assert!(db.get_account("acc", "secret").is_some());
        assert!(db.get_account("acc", "wrong").is_none());
    }
}
