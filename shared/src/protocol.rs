//! Messages exchanged between the session transport and the simulation core.

use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Default base tick length in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 250;

pub type PlayerId = u64;

/// A command typed by a player, split into verb and target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub player_id: PlayerId,
    pub verb: String,
    pub target: String,
    pub raw_text: String,
    /// Unix milliseconds at which the transport accepted the line
    pub submitted_at: u64,
}

impl PlayerCommand {
    /// Split a raw line into a lowercase verb and the remaining target text
    pub fn parse(player_id: PlayerId, raw_text: &str, submitted_at: u64) -> Self {
        let trimmed = raw_text.trim();
        let (verb, target) = match trimmed.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (trimmed, ""),
        };

        Self {
            player_id,
            verb: verb.to_ascii_lowercase(),
            target: target.to_string(),
            raw_text: raw_text.to_string(),
            submitted_at,
        }
    }

    /// Target split into words, lowercased
    pub fn target_words(&self) -> Vec<String> {
        self.target
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect()
    }
}

/// Category of an outbound message, used by clients for colouring and routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Info,
    Error,
    Room,
    Combat,
    Loot,
    Experience,
    Ambient,
    System,
}

/// A line of text queued for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub player_id: PlayerId,
    pub message_type: MessageType,
    pub payload: String,
}

impl OutboundMessage {
    pub fn new(player_id: PlayerId, message_type: MessageType, payload: impl Into<String>) -> Self {
        Self {
            player_id,
            message_type,
            payload: payload.into(),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
