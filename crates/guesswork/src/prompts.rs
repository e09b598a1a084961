//! Status texts shown on the display and the digit cells.

pub const LOOKING: &str = "Looking for other players.";
pub const NO_PLAYERS: &str =
    "Looking for other players.\nNo other players found - cannot start game.";
pub const STARTING: &str = "Starting game.";
pub const LEADER_PROMPT: &str = "Choose number that the other players will try to guess.";
pub const LEADER_WAITING: &str = "Waiting for other players.";
pub const GUESSER_WAITING: &str = "Waiting for result.";

/// Shown on the digit cells while discovering.
pub const SCANNING_CELLS: &str = "SCANNING";

pub fn host_status(players: usize) -> String {
    format!(
        "You are the host (player 1).\nCurrent players: {players}.\nPress button to start the game."
    )
}

pub fn client_status(player: usize, players: usize) -> String {
    format!(
        "You are player {player}.\nWaiting for host to start the game.\nCurrent players: {players}"
    )
}

pub fn player_cells(player: usize) -> String {
    format!("PLAYER {player}")
}

/// `leader` is the leader's one-based player number, if known.
pub fn guesser_prompt(leader: Option<usize>) -> String {
    match leader {
        Some(n) => format!("Player {n} is choosing a number.\nEnter your guess."),
        None => "Another player is choosing a number.\nEnter your guess.".to_string(),
    }
}

/// Appends the countdown line. Seconds are `remaining + 1` rounded to a
/// whole number, so the display reaches 1 as time runs out.
pub fn with_countdown(prompt: &str, remaining_secs: f64) -> String {
    format!("{prompt}\nYou have {:.0} sec.", remaining_secs + 1.0)
}
