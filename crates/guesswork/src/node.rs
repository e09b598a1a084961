//! The node runtime: one task that owns every piece of game state.
//!
//! A node connects to the bus, announces itself, and then loops over four
//! event sources with `tokio::select!`:
//!
//! - the shutdown future
//! - the 10 ms capture tick (paused unless a round is being entered)
//! - inbound bus messages
//! - the 100 ms idle tick that polls the button
//!
//! Sources are checked in that order.
//!
//! Each event is handled to completion before the next is taken, so the
//! roster, roles, game state, and guesses are never touched concurrently
//! and need no locks.

use std::future::Future;

use guesswork_discovery::{DiscoverRole, Discovery};
use guesswork_protocol::{Envelope, JsonCodec, Message, MessageCodec, SessionId};
use guesswork_round::{
    CaptureOutcome, Emphasis, GameState, GuessOutcome, InputSurface, RoundConfig, RoundEngine,
    RoundError, RoundRoles, StatusDisplay, clear_surface, write_digits, write_lamps, write_text,
};
use guesswork_tick::{TickConfig, TickScheduler};
use guesswork_transport::{Bus, BusMessage, Inbound, TransportError};
use tokio::time::Instant;

use crate::{GuessworkError, NodeConfig, prompts};

// ---------------------------------------------------------------------------
// GameCore
// ---------------------------------------------------------------------------

/// Everything one device knows about the game: discovery role and roster,
/// plus the round engine. Owned by exactly one [`Node`].
#[derive(Debug)]
pub struct GameCore {
    discovery: Discovery,
    round: RoundEngine,
}

impl GameCore {
    pub fn new(identity: SessionId, round: RoundConfig) -> Self {
        Self {
            discovery: Discovery::new(identity.clone()),
            round: RoundEngine::new(identity, round),
        }
    }

    pub fn identity(&self) -> &SessionId {
        self.discovery.identity()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn round(&self) -> &RoundEngine {
        &self.round
    }

    pub fn role(&self) -> DiscoverRole {
        self.discovery.role()
    }

    pub fn state(&self) -> GameState {
        self.round.state()
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One device in the game.
///
/// Build with [`NodeBuilder`](crate::NodeBuilder), then call [`run`](Self::run) with a
/// future that resolves when the node should stop.
pub struct Node<B: Bus, S: InputSurface, D: StatusDisplay> {
    config: NodeConfig,
    codec: MessageCodec<JsonCodec>,
    bus: B,
    surface: S,
    display: D,
    game: GameCore,
    capture_ticks: TickScheduler,
    idle_ticks: TickScheduler,
    /// Prompt for the current round, without the countdown line.
    prompt: String,
    /// Last countdown text drawn; redrawn only when it changes.
    countdown: Option<String>,
    button_was_pressed: bool,
    started: bool,
    shut_down: bool,
}

impl<B: Bus, S: InputSurface, D: StatusDisplay> Node<B, S, D> {
    pub(crate) fn new(
        config: NodeConfig,
        codec: MessageCodec<JsonCodec>,
        bus: B,
        surface: S,
        display: D,
    ) -> Self {
        let game = GameCore::new(codec.identity().clone(), config.round.clone());
        Self {
            capture_ticks: TickScheduler::paused(TickConfig::with_period(config.round.tick_period)),
            idle_ticks: TickScheduler::paused(TickConfig::with_period(config.idle_poll)),
            config,
            codec,
            bus,
            surface,
            display,
            game,
            prompt: String::new(),
            countdown: None,
            button_was_pressed: false,
            started: false,
            shut_down: false,
        }
    }

    pub fn identity(&self) -> &SessionId {
        self.codec.identity()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn game(&self) -> &GameCore {
        &self.game
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Runs the node until `shutdown` resolves or the bus fails.
    ///
    /// Either way the shutdown sequence runs before this returns: the bus
    /// is disconnected, the display cleared, every cell blanked, and every
    /// lamp turned off. A round still being entered is abandoned.
    ///
    /// # Errors
    /// Returns the transport error that ended the run, if any.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), GuessworkError>
    where
        F: Future<Output = ()>,
    {
        let result = match self.start().await {
            Ok(mut inbound) => self.event_loop(&mut inbound, shutdown).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::error!(identity = %self.identity(), error = %e, "node failed, shutting down");
        }
        self.shutdown().await;
        result
    }

    async fn start(&mut self) -> Result<Inbound, GuessworkError> {
        self.started = true;
        tracing::info!(
            identity = %self.identity(),
            broker = %self.config.broker_address,
            base_topic = %self.config.base_topic,
            "connecting"
        );

        let inbound = self.bus.connect(&self.config.broker_address).await?;
        self.bus.subscribe(&self.codec.subscription(), true).await?;
        self.publish(&Message::Find).await?;

        self.display.show_message(prompts::LOOKING, Emphasis::Large, true);
        write_text(&mut self.surface, prompts::SCANNING_CELLS);
        self.idle_ticks.resume();
        Ok(inbound)
    }

    async fn event_loop<F>(
        &mut self,
        inbound: &mut Inbound,
        shutdown: F,
    ) -> Result<(), GuessworkError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::info!(identity = %self.identity(), "shutdown requested");
                    return Ok(());
                }

                // A due capture tick goes before queued messages so bus
                // traffic cannot stretch the capture phase.
                tick = self.capture_ticks.wait_for_tick() => {
                    non_fatal(self.capture_tick(tick.at).await, "capture tick")?;
                    self.capture_ticks.record_tick_end();
                }

                msg = inbound.recv() => {
                    let Some(msg) = msg else {
                        return Err(TransportError::ConnectionClosed(
                            "bus inbound channel closed".into(),
                        )
                        .into());
                    };
                    non_fatal(self.handle_bus_message(msg).await, "message dropped")?;
                }

                _ = self.idle_ticks.wait_for_tick() => {
                    non_fatal(self.poll_button().await, "button press refused")?;
                    self.idle_ticks.record_tick_end();
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.capture_ticks.pause();
        self.idle_ticks.pause();
        self.game.round.abort_capture();

        if let Err(e) = self.bus.disconnect().await {
            tracing::warn!(error = %e, "bus disconnect failed during shutdown");
        }
        self.display.clear();
        clear_surface(&mut self.surface);

        self.shut_down = true;
        tracing::info!(identity = %self.identity(), "node shut down");
    }

    async fn publish(&self, message: &Message) -> Result<(), GuessworkError> {
        let (topic, payload) = self.codec.encode(message)?;
        tracing::debug!(topic = %topic, "publishing");
        self.bus.publish(&topic, &payload).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inbound messages
    // -----------------------------------------------------------------------

    async fn handle_bus_message(&mut self, msg: BusMessage) -> Result<(), GuessworkError> {
        let Some(Envelope {
            identity: sender,
            message,
        }) = self.codec.decode(&msg.topic, &msg.payload)?
        else {
            tracing::trace!(topic = %msg.topic, "not a game topic");
            return Ok(());
        };

        // The broker may echo our own publishes despite `no_local`.
        if sender == *self.identity() {
            tracing::trace!(topic = %msg.topic, "ignoring own message");
            return Ok(());
        }

        match message {
            Message::Roles { leader, guessers } => {
                self.begin_round(RoundRoles::new(leader, guessers)).await
            }
            Message::Guess { guess } => self.on_guess(&sender, guess).await,
            Message::NewRound => self.on_new_round_request(&sender).await,
            Message::Find => self.on_find(&sender).await,
            Message::Ack { roster } => {
                self.on_ack(&sender, roster);
                Ok(())
            }
        }
    }

    async fn on_find(&mut self, sender: &SessionId) -> Result<(), GuessworkError> {
        if !self.game.state().is_discovering() {
            tracing::debug!(%sender, "ignoring find, game already started");
            return Ok(());
        }
        let Some(reply) = self.game.discovery.on_find(sender) else {
            return Ok(());
        };

        let players = reply.roster.len();
        self.publish(&Message::Ack {
            roster: reply.roster,
        })
        .await?;
        self.display
            .show_message(&prompts::host_status(players), Emphasis::Normal, true);
        write_text(&mut self.surface, &prompts::player_cells(1));
        Ok(())
    }

    fn on_ack(&mut self, sender: &SessionId, roster: Vec<SessionId>) {
        if !self.game.state().is_discovering() {
            tracing::debug!(%sender, "ignoring ack, game already started");
            return;
        }
        let Some(update) = self.game.discovery.on_ack(sender, roster) else {
            return;
        };

        self.display.show_message(
            &prompts::client_status(update.player_number, update.roster_len),
            Emphasis::Normal,
            true,
        );
        write_text(&mut self.surface, &prompts::player_cells(update.player_number));
    }

    async fn on_guess(&mut self, sender: &SessionId, guess: u32) -> Result<(), GuessworkError> {
        let roster_len = self.game.discovery.roster().len();
        match self.game.round.record_guess(sender, guess, roster_len) {
            GuessOutcome::Complete => {
                tracing::info!(round = self.game.round.round_number(), "all guesses received");
                if self.game.discovery.is_host() {
                    self.request_new_round().await
                } else {
                    // Only the host may publish roles.
                    self.publish(&Message::NewRound).await
                }
            }
            GuessOutcome::Recorded { .. } => Ok(()),
            GuessOutcome::Ignored => {
                tracing::trace!(%sender, "guess not for us");
                Ok(())
            }
        }
    }

    async fn on_new_round_request(&mut self, sender: &SessionId) -> Result<(), GuessworkError> {
        if !self.game.discovery.is_host() {
            tracing::trace!(%sender, "new round request ignored, not host");
            return Ok(());
        }
        tracing::info!(%sender, "leader asked for a new round");
        self.request_new_round().await
    }

    // -----------------------------------------------------------------------
    // Rounds
    // -----------------------------------------------------------------------

    /// Host only: picks roles, broadcasts them, and starts the round here.
    async fn request_new_round(&mut self) -> Result<(), GuessworkError> {
        let roles = self
            .game
            .round
            .select_roles(self.game.discovery.is_host(), self.game.discovery.roster().as_slice())?;

        self.publish(&Message::Roles {
            leader: roles.leader.clone(),
            guessers: roles.guessers.clone(),
        })
        .await?;
        self.display
            .show_message(prompts::STARTING, Emphasis::Large, true);
        self.begin_round(roles).await
    }

    async fn begin_round(&mut self, roles: RoundRoles) -> Result<(), GuessworkError> {
        let now = Instant::now();
        let leader_number = self.game.discovery.roster().player_number(&roles.leader);

        self.prompt = match self.game.round.start_round(roles, now) {
            GameState::Leader => prompts::LEADER_PROMPT.to_string(),
            GameState::Guesser | GameState::Discovering => prompts::guesser_prompt(leader_number),
        };
        self.display.show_message(&self.prompt, Emphasis::Normal, true);
        self.countdown = None;

        self.capture_ticks.resume();
        self.capture_tick(now).await
    }

    async fn capture_tick(&mut self, now: Instant) -> Result<(), GuessworkError> {
        let switches = self.surface.switches();
        let Some(frame) = self.game.round.tick(now, switches) else {
            self.capture_ticks.pause();
            return Ok(());
        };

        let text = prompts::with_countdown(&self.prompt, frame.remaining_secs);
        if self.countdown.as_deref() != Some(text.as_str()) {
            self.display.show_message(&text, Emphasis::Normal, false);
            self.countdown = Some(text);
        }
        write_lamps(&mut self.surface, &frame.lamps);
        write_digits(&mut self.surface, &frame.digits);

        if frame.expired {
            self.capture_ticks.pause();
            self.complete_capture().await?;
        }
        Ok(())
    }

    async fn complete_capture(&mut self) -> Result<(), GuessworkError> {
        match self.game.round.finish_capture() {
            Some(CaptureOutcome::Target(_)) => {
                self.display
                    .show_message(prompts::LEADER_WAITING, Emphasis::Normal, true);
            }
            Some(CaptureOutcome::Guess(guess)) => {
                self.publish(&Message::Guess { guess }).await?;
                self.display
                    .show_message(prompts::GUESSER_WAITING, Emphasis::Normal, true);
            }
            None => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Button
    // -----------------------------------------------------------------------

    async fn poll_button(&mut self) -> Result<(), GuessworkError> {
        let pressed = self.surface.button();
        let rising = pressed && !self.button_was_pressed;
        self.button_was_pressed = pressed;
        if rising {
            self.on_button().await
        } else {
            Ok(())
        }
    }

    async fn on_button(&mut self) -> Result<(), GuessworkError> {
        tracing::info!(role = %self.game.role(), state = %self.game.state(), "button pressed");
        self.game.round.ensure_discovering()?;

        match self.game.role() {
            DiscoverRole::Unknown => {
                self.display
                    .show_message(prompts::NO_PLAYERS, Emphasis::Normal, true);
                Ok(())
            }
            DiscoverRole::Host => self.request_new_round().await,
            DiscoverRole::Client => Err(RoundError::NotHost.into()),
        }
    }
}

/// Clears the indicators if the node goes away without its shutdown
/// sequence, e.g. while unwinding from a panic.
impl<B: Bus, S: InputSurface, D: StatusDisplay> Drop for Node<B, S, D> {
    fn drop(&mut self) {
        if self.started && !self.shut_down {
            tracing::error!(
                identity = %self.identity(),
                "node dropped without shutdown, clearing indicators"
            );
            self.display.clear();
            clear_surface(&mut self.surface);
        }
    }
}

/// Logs and swallows errors that must not stop the node.
fn non_fatal(result: Result<(), GuessworkError>, context: &str) -> Result<(), GuessworkError> {
    match result {
        Err(e) if !e.is_fatal() => {
            tracing::debug!(error = %e, context, "non-fatal error");
            Ok(())
        }
        other => other,
    }
}
