//! The round engine: game state, roles, capture phase, and guess collection.

use guesswork_protocol::SessionId;
use rand::seq::IndexedRandom;
use tokio::time::Instant;

use crate::{
    COLUMNS, CaptureFrame, CapturePhase, GameState, GuessCollection, GuessOutcome,
    LeaderSelection, RoundConfig, RoundError, RoundRoles,
};

/// What to do with the number once the capture phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// We lead this round; the number is the target. Nothing to send.
    Target(u32),
    /// We guess this round; publish the number on `game/guess`.
    Guess(u32),
}

/// Owns everything about rounds on one device.
///
/// The engine is pure state: it never touches the bus or the hardware.
/// The node feeds it roles, ticks, and guesses, and acts on what it
/// returns.
#[derive(Debug)]
pub struct RoundEngine {
    identity: SessionId,
    config: RoundConfig,
    state: GameState,
    roles: Option<RoundRoles>,
    capture: Option<CapturePhase>,
    guesses: GuessCollection,
    target: Option<u32>,
    rounds: u64,
    /// Set once this round's guesses reached the threshold.
    guessing_complete: bool,
}

impl RoundEngine {
    pub fn new(identity: SessionId, config: RoundConfig) -> Self {
        Self {
            identity,
            config,
            state: GameState::Discovering,
            roles: None,
            capture: None,
            guesses: GuessCollection::new(),
            target: None,
            rounds: 0,
            guessing_complete: false,
        }
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Roles of the current round, if one has started.
    pub fn roles(&self) -> Option<&RoundRoles> {
        self.roles.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// The number we chose the last time we led a round.
    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn guesses(&self) -> &GuessCollection {
        &self.guesses
    }

    /// Rounds started so far.
    pub fn round_number(&self) -> u64 {
        self.rounds
    }

    /// Fails with [`RoundError::RoundInProgress`] once any round has
    /// started. The button only works before the game is under way.
    pub fn ensure_discovering(&self) -> Result<(), RoundError> {
        if self.state.is_discovering() {
            Ok(())
        } else {
            Err(RoundError::RoundInProgress)
        }
    }

    /// Picks the next round's roles from `roster`.
    ///
    /// # Errors
    /// - [`RoundError::NotHost`] if `is_host` is false.
    /// - [`RoundError::RosterTooSmall`] with fewer than two players.
    pub fn select_roles(
        &self,
        is_host: bool,
        roster: &[SessionId],
    ) -> Result<RoundRoles, RoundError> {
        if !is_host {
            return Err(RoundError::NotHost);
        }
        if roster.len() < 2 {
            return Err(RoundError::RosterTooSmall {
                players: roster.len(),
            });
        }

        let leader = match self.config.leader_selection {
            LeaderSelection::Random => roster.choose(&mut rand::rng()),
            LeaderSelection::FirstSlot => roster.first(),
        }
        .cloned()
        .ok_or(RoundError::RosterTooSmall {
            players: roster.len(),
        })?;

        Ok(RoundRoles::from_roster(leader, roster))
    }

    /// Starts a round from a `game/roles` message, our own included.
    ///
    /// Clears the guesses and begins a fresh capture phase at `now`. A
    /// capture still running from the previous round is abandoned.
    pub fn start_round(&mut self, roles: RoundRoles, now: Instant) -> GameState {
        if self.capture.is_some() {
            tracing::debug!(round = self.rounds, "abandoning unfinished capture");
        }

        self.state = self.state.on_roles(&roles, &self.identity);
        self.rounds += 1;
        self.guesses.clear();
        self.guessing_complete = false;
        self.capture = Some(CapturePhase::new(&self.config, now));

        tracing::info!(
            round = self.rounds,
            state = %self.state,
            leader = %roles.leader,
            guessers = roles.guessers.len(),
            "round started"
        );
        self.roles = Some(roles);
        self.state
    }

    /// Advances the capture phase. Returns `None` when no phase is running.
    ///
    /// When the returned frame is `expired`, draw it and then call
    /// [`finish_capture`](Self::finish_capture).
    pub fn tick(&mut self, now: Instant, switches: [bool; COLUMNS]) -> Option<CaptureFrame> {
        self.capture.as_mut().map(|c| c.tick(now, switches))
    }

    /// Ends the capture phase and composes the entered number.
    pub fn finish_capture(&mut self) -> Option<CaptureOutcome> {
        let capture = self.capture.take()?;
        let number = capture.number();
        tracing::info!(round = self.rounds, number, ticks = capture.ticks(), "number entered");

        match self.state {
            GameState::Leader => {
                self.target = Some(number);
                Some(CaptureOutcome::Target(number))
            }
            GameState::Guesser => Some(CaptureOutcome::Guess(number)),
            GameState::Discovering => None,
        }
    }

    /// Abandons a running capture without producing a number.
    pub fn abort_capture(&mut self) {
        if self.capture.take().is_some() {
            tracing::debug!(round = self.rounds, "capture aborted");
        }
    }

    /// Records a peer's guess. Only the leader collects guesses, during
    /// its own capture phase and after it.
    ///
    /// The round is complete once `roster_len - 1` distinct guessers have
    /// guessed; later guesses for the same round are ignored.
    pub fn record_guess(
        &mut self,
        from: &SessionId,
        guess: u32,
        roster_len: usize,
    ) -> GuessOutcome {
        if self.state != GameState::Leader || *from == self.identity {
            return GuessOutcome::Ignored;
        }
        if self.guessing_complete {
            tracing::debug!(from = %from, guess, "guessing already complete, ignoring");
            return GuessOutcome::Ignored;
        }

        if let Some(previous) = self.guesses.insert(from.clone(), guess) {
            tracing::debug!(from = %from, previous, guess, "guess replaced");
        }
        let received = self.guesses.len();
        let expected = roster_len.saturating_sub(1);
        tracing::info!(from = %from, guess, received, expected, "guess received");

        if received == expected {
            self.guessing_complete = true;
            GuessOutcome::Complete
        } else {
            GuessOutcome::Recorded { received, expected }
        }
    }
}
