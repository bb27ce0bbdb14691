//! A single local session over stdin and stdout.
//!
//! Lines typed at the terminal become commands in the intake queue; whatever
//! the scheduler sends back for this player is printed as it arrives.

use std::time::{SystemTime, UNIX_EPOCH};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use mud_shared::{MessageType, OutboundMessage, PlayerCommand, PlayerId};

use crate::entities::Player;
use crate::scheduler::CommandIntake;

/// What a typed line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Blank,
    Quit,
    Command(String),
}

impl ConsoleInput {
    pub fn interpret(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => ConsoleInput::Blank,
            "quit" | "exit" | "logout" => ConsoleInput::Quit,
            _ => ConsoleInput::Command(trimmed.to_string()),
        }
    }
}

/// Render a message for the terminal
pub fn render(message: &OutboundMessage) -> String {
    match message.message_type {
        MessageType::Error => format!("! {}", message.payload),
        MessageType::Ambient => format!("~ {}", message.payload),
        _ => message.payload.clone(),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The terminal player's connection to the scheduler
pub struct ConsoleSession {
    player_id: PlayerId,
    intake: CommandIntake,
}

impl ConsoleSession {
    pub fn new(player_id: PlayerId, intake: CommandIntake) -> Self {
        Self { player_id, intake }
    }

    /// Connect `player`, then relay lines until quit or end of input
    pub async fn run(self, player: Player, outbound: mpsc::UnboundedReceiver<OutboundMessage>) {
        let printer = tokio::spawn(print_outbound(self.player_id, outbound));

        if !self.intake.connect(player) {
            warn!("Scheduler is not running; console session closed");
            printer.abort();
            return;
        }
        info!("Console session started for player {}", self.player_id);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read from stdin: {}", e);
                    break;
                }
            };

            match ConsoleInput::interpret(&line) {
                ConsoleInput::Blank => continue,
                ConsoleInput::Quit => break,
                ConsoleInput::Command(text) => {
                    let command = PlayerCommand::parse(self.player_id, &text, unix_millis());
                    if !self.intake.submit(command) {
                        warn!("Scheduler stopped; dropping input");
                        break;
                    }
                }
            }
        }

        self.intake.disconnect(self.player_id);
        info!("Console session ended for player {}", self.player_id);
        // Dropping the intake lets the scheduler wind down; the printer ends with it
        drop(self.intake);
        let _ = printer.await;
    }
}

async fn print_outbound(player_id: PlayerId, mut outbound: mpsc::UnboundedReceiver<OutboundMessage>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        if message.player_id != player_id {
            continue;
        }
        let line = format!("{}\n", render(&message));
        if stdout.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        let _ = stdout.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_lines() {
        assert_eq!(ConsoleInput::interpret("   "), ConsoleInput::Blank);
        assert_eq!(ConsoleInput::interpret("QUIT"), ConsoleInput::Quit);
        assert_eq!(
            ConsoleInput::interpret("  attack rat "),
            ConsoleInput::Command("attack rat".into())
        );
    }

    #[test]
    fn test_render_marks_errors_and_ambient() {
        let err = OutboundMessage::new(1, MessageType::Error, "You must wait 1.0 seconds.");
        assert_eq!(render(&err), "! You must wait 1.0 seconds.");
        let amb = OutboundMessage::new(1, MessageType::Ambient, "The sun rises.");
        assert_eq!(render(&amb), "~ The sun rises.");
        let room = OutboundMessage::new(1, MessageType::Room, "[Market Street]");
        assert_eq!(render(&room), "[Market Street]");
    }
}
