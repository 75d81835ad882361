use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChannelId(pub u16);

/// A chat channel definition. Membership is tracked per player (their
/// opened-channel set), never on the channel itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: BTreeMap<ChannelId, Channel>,
}

#[derive(Debug, Deserialize)]
struct ChannelFile {
    channels: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    id: u16,
    name: String,
}

impl ChannelRegistry {
    /// The built-in channel table used when no channels.yaml is present.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            channels: BTreeMap::new(),
        };
        for (id, name) in [
            (0x04, "Game-Chat"),
            (0x05, "Trade"),
            (0x06, "RL-Chat"),
            (0x09, "Help"),
        ] {
            registry.insert(Channel {
                id: ChannelId(id),
                name: name.to_string(),
            });
        }
        registry
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|err| format!("channel list read failed for {}: {}", path.display(), err))?;
        let file: ChannelFile = serde_yaml::from_str(&data)
            .map_err(|err| format!("invalid channel yaml in {}: {}", path.display(), err))?;
        let mut registry = Self {
            channels: BTreeMap::new(),
        };
        for entry in file.channels {
            registry.insert(Channel {
                id: ChannelId(entry.id),
                name: entry.name,
            });
        }
        Ok(registry)
    }

    pub fn insert(&mut self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
