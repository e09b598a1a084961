//! Runs one Guesswork device, or the relay the devices share.
//!
//! ```text
//! GUESSWORK_MODE=relay GUESSWORK_RELAY_BIND=127.0.0.1:1883 guess-node
//! GUESSWORK_BROKER=127.0.0.1:1883 guess-node
//! ```
//!
//! A node reads its switches and button from stdin, one command per line:
//!
//! | Line | Effect                         |
//! |------|--------------------------------|
//! | `b`  | press the button               |
//! | `0`…`7` | tap that switch once        |
//! | `+3` / `-3` | hold / release switch 3 |
//! | `q`  | quit                           |

use std::time::Duration;

use guesswork::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

/// How long a tap holds the switch or button down.
const TAP: Duration = Duration::from_millis(150);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match env_or("GUESSWORK_MODE", "node").as_str() {
        "relay" => run_relay().await,
        _ => run_node().await,
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

async fn run_relay() -> Result<(), Box<dyn std::error::Error>> {
    let relay = BusRelay::bind(&env_or("GUESSWORK_RELAY_BIND", guesswork::DEFAULT_BROKER)).await?;
    tracing::info!(addr = %relay.local_addr()?, "relay listening");
    tokio::select! {
        result = relay.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("relay stopping"),
    }
    Ok(())
}

async fn run_node() -> Result<(), Box<dyn std::error::Error>> {
    let leader_selection = match env_or("GUESSWORK_LEADER", "random").as_str() {
        "first" => LeaderSelection::FirstSlot,
        _ => LeaderSelection::Random,
    };
    let config = NodeConfig {
        broker_address: env_or("GUESSWORK_BROKER", guesswork::DEFAULT_BROKER),
        base_topic: env_or("GUESSWORK_BASE_TOPIC", guesswork::DEFAULT_BASE_TOPIC),
        round: RoundConfig {
            leader_selection,
            ..RoundConfig::default()
        },
        ..NodeConfig::default()
    };

    let surface = VirtualSurface::new();
    let mut node = NodeBuilder::new()
        .config(config)
        .build(WebSocketBus::new(), surface.clone(), VirtualDisplay::new());
    tracing::info!(identity = %node.identity(), "starting node");

    let (quit_tx, quit_rx) = oneshot::channel();
    let input = tokio::spawn(read_commands(surface, quit_tx));

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received ctrl-c, exiting"),
            _ = quit_rx => tracing::info!("quit requested"),
        }
    };
    let result = node.run(shutdown).await;

    input.abort();
    // Aborted is the expected outcome here.
    let _ = input.await;
    result.map_err(Into::into)
}

/// Drives the virtual surface from stdin until EOF or `q`.
async fn read_commands(surface: VirtualSurface, quit: oneshot::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };

        match parse_command(line.trim()) {
            Some(Command::Button) => {
                surface.set_button(true);
                tokio::time::sleep(TAP).await;
                surface.set_button(false);
            }
            Some(Command::Tap(i)) => {
                surface.set_switch(i, true);
                tokio::time::sleep(TAP).await;
                surface.set_switch(i, false);
            }
            Some(Command::Hold(i)) => surface.set_switch(i, true),
            Some(Command::Release(i)) => surface.set_switch(i, false),
            Some(Command::Quit) => break,
            None => tracing::warn!(line = %line, "unknown command"),
        }
    }
    let _ = quit.send(());
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Button,
    Tap(usize),
    Hold(usize),
    Release(usize),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let switch = |s: &str| s.parse::<usize>().ok().filter(|i| *i < COLUMNS);
    match line {
        "b" => Some(Command::Button),
        "q" => Some(Command::Quit),
        _ => {
            if let Some(rest) = line.strip_prefix('+') {
                switch(rest).map(Command::Hold)
            } else if let Some(rest) = line.strip_prefix('-') {
                switch(rest).map(Command::Release)
            } else {
                switch(line).map(Command::Tap)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("b"), Some(Command::Button));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("3"), Some(Command::Tap(3)));
        assert_eq!(parse_command("+7"), Some(Command::Hold(7)));
        assert_eq!(parse_command("-0"), Some(Command::Release(0)));
        assert_eq!(parse_command("8"), None);
        assert_eq!(parse_command("x"), None);
    }
}
