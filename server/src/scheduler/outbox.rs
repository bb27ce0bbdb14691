//! Per-player outbound message queues, flushed once per tick.

use std::collections::BTreeMap;

use mud_shared::{MessageType, OutboundMessage, PlayerId};

#[derive(Debug, Default)]
pub struct Outbox {
    queues: BTreeMap<PlayerId, Vec<OutboundMessage>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, player_id: PlayerId, message_type: MessageType, payload: impl Into<String>) {
        self.queues
            .entry(player_id)
            .or_default()
            .push(OutboundMessage::new(player_id, message_type, payload));
    }

    pub fn info(&mut self, player_id: PlayerId, payload: impl Into<String>) {
        self.push(player_id, MessageType::Info, payload);
    }

    pub fn error(&mut self, player_id: PlayerId, payload: impl Into<String>) {
        self.push(player_id, MessageType::Error, payload);
    }

    /// Queue the same message for several players
    pub fn broadcast<'a>(
        &mut self,
        recipients: impl IntoIterator<Item = &'a PlayerId>,
        except: Option<PlayerId>,
        message_type: MessageType,
        payload: &str,
    ) {
        for id in recipients {
            if Some(*id) != except {
                self.push(*id, message_type, payload);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(Vec::is_empty)
    }

    /// Queued messages for one player, oldest first
    pub fn pending(&self, player_id: PlayerId) -> &[OutboundMessage] {
        self.queues.get(&player_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Take everything queued, grouped by player in id order
    pub fn flush(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.queues).into_values().flatten().collect()
    }
}
