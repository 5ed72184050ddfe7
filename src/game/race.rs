//! Race State Machine
//!
//! Owns one race instance and drives it through
//! ready → countdown → racing ⇄ paused → finished.
//!
//! The host calls [`Race::step`] once per frame with the elapsed time and
//! feeds input through [`Race::handle_input`]. Every call returns the events
//! it produced; the same events are published on the broadcast bus. Hosts
//! that poll instead opt in with [`Race::polling`] and drain an outbox with
//! [`Race::take_events`].
//!
//! # Step order
//!
//! 1. Countdown timer (countdown only)
//! 2. Race clock
//! 3. Controlled racer physics, then checkpoint or finish detection (racing only)
//! 4. AI movement and finish detection (racing or paused)
//! 5. AI pace drift
//! 6. Finish positions in crossing order
//! 7. Results and the finished transition

use rand::RngCore;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::hash::StateHash;
use crate::core::rng::DeterministicRng;
use crate::game::checkpoint::{enter_gate, reached_checkpoint, resolve_answer, AnswerOutcome};
use crate::game::competitor::{advance_competitors, drift_paces};
use crate::game::config::{ConfigError, RaceConfig};
use crate::game::events::{HostInput, RaceEvent};
use crate::game::physics::{apply_tap, integrate};
use crate::game::results::{self, assign_finishes, FinishCrossing, RaceResult};
use crate::game::state::{RacePhase, RaceState, RacerState, CONTROLLED_INDEX};
use crate::replay::transcript::{RaceTranscript, Recorder};
use crate::surface::bus::EventBus;

/// Result of one [`Race::step`].
#[derive(Debug, Default)]
pub struct StepResult {
    /// Events generated this step.
    pub events: Vec<RaceEvent>,
    /// Whether every racer has finished.
    pub all_finished: bool,
}

/// One race instance plus its injected randomness and notification channel.
pub struct Race {
    config: RaceConfig,
    state: RaceState,
    rng: Box<dyn RngCore + Send>,
    bus: EventBus,
    outbox: Option<Vec<RaceEvent>>,
    recorder: Option<Recorder>,
}

impl std::fmt::Debug for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field("phase", &self.state.phase)
            .field("round", &self.state.round)
            .field("clock_s", &self.state.clock_s)
            .field("racers", &self.state.racers.len())
            .field("polling", &self.outbox.is_some())
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}

impl Race {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Validate `config` and set up a race in `Ready`.
    ///
    /// `rng` drives roster selection, initial paces and pace drift.
    pub fn init<R>(config: RaceConfig, rng: R) -> Result<Self, ConfigError>
    where
        R: RngCore + Send + 'static,
    {
        config.validate()?;

        let mut rng: Box<dyn RngCore + Send> = Box::new(rng);
        let state = RaceState::setup(&config, &mut *rng, 0);
        info!(
            competitors = state.racers.len() - 1,
            checkpoints = state.checkpoints.len(),
            "race initialized"
        );

        Ok(Self {
            config,
            state,
            rng,
            bus: EventBus::default(),
            outbox: None,
            recorder: None,
        })
    }

    /// Race driven by a seeded [`DeterministicRng`].
    pub fn with_seed(config: RaceConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::init(config, DeterministicRng::new(seed))
    }

    /// Seeded race that records every input and step for later replay.
    pub fn recorded(config: RaceConfig, seed: u64) -> Result<Self, ConfigError> {
        let recorder = Recorder::new(seed, config.clone());
        let mut race = Self::with_seed(config, seed)?;
        race.recorder = Some(recorder);
        Ok(race)
    }

    /// Keep every event in an outbox until [`Race::take_events`] drains it.
    pub fn polling(mut self) -> Self {
        self.outbox.get_or_insert_with(Vec::new);
        self
    }

    /// End the race: close the event channel and return the final standings.
    pub fn teardown(self) -> Vec<RaceResult> {
        let standings = results::standings(&self.state);
        info!(
            phase = %self.state.phase,
            finished = self.state.ledger.finished_count(),
            "race torn down"
        );
        standings
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Apply one host input.
    pub fn handle_input(&mut self, input: HostInput) -> Vec<RaceEvent> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_input(input);
        }

        match input {
            HostInput::Tap => self.on_tap(),
            HostInput::Restart => self.on_restart(),
            HostInput::AnswerSubmitted { correct, time_taken_ms } => {
                resolve_answer(
                    &mut self.state,
                    &self.config.tuning,
                    AnswerOutcome { correct, time_taken_ms },
                );
            }
        }

        self.flush()
    }

    /// Shorthand for [`HostInput::Tap`].
    pub fn tap(&mut self) -> Vec<RaceEvent> {
        self.handle_input(HostInput::Tap)
    }

    /// Shorthand for [`HostInput::Restart`].
    pub fn restart(&mut self) -> Vec<RaceEvent> {
        self.handle_input(HostInput::Restart)
    }

    /// Shorthand for [`HostInput::AnswerSubmitted`].
    pub fn submit_answer(&mut self, outcome: AnswerOutcome) -> Vec<RaceEvent> {
        self.handle_input(HostInput::answer(outcome))
    }

    fn on_tap(&mut self) {
        match self.state.phase {
            RacePhase::Ready => self.start_countdown(),
            RacePhase::Racing if !self.state.controlled().has_finished() => {
                apply_tap(self.state.controlled_mut(), &self.config.tuning);
            }
            phase => debug!(%phase, "tap ignored"),
        }
    }

    fn on_restart(&mut self) {
        let round = self.state.round + 1;
        self.state = RaceState::setup(&self.config, &mut *self.rng, round);

        // Always announced, even when restarting from Ready.
        info!(round, "race restarted");
        self.state.push_event(RaceEvent::StateChanged {
            state: RacePhase::Ready,
        });
    }

    // =========================================================================
    // STEP
    // =========================================================================

    /// Advance the simulation by `delta_seconds`.
    ///
    /// Zero, negative and non-finite deltas advance nothing.
    pub fn step(&mut self, delta_seconds: f64) -> StepResult {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_step(delta_seconds);
        }

        if !delta_seconds.is_finite() || delta_seconds < 0.0 {
            debug!(delta_seconds, "invalid step delta ignored");
        } else if delta_seconds > 0.0 {
            match self.state.phase {
                RacePhase::Countdown => self.advance_countdown(delta_seconds),
                phase if phase.is_live() => self.advance_race(delta_seconds),
                _ => {}
            }
        }

        StepResult {
            events: self.flush(),
            all_finished: self.state.all_finished(),
        }
    }

    fn start_countdown(&mut self) {
        let from = self.config.countdown_from;
        self.state.set_phase(RacePhase::Countdown);
        self.state.countdown.remaining = from;
        self.state.countdown.timer = 0.0;
        self.state.push_event(RaceEvent::CountdownTick { count: from });

        if from == 0 {
            self.go();
        }
    }

    fn advance_countdown(&mut self, dt: f64) {
        let interval = self.config.countdown_interval_s;
        self.state.countdown.timer += dt;

        while self.state.phase == RacePhase::Countdown && self.state.countdown.timer >= interval {
            self.state.countdown.timer -= interval;
            let count = self.state.countdown.remaining.saturating_sub(1);
            self.state.countdown.remaining = count;
            self.state.push_event(RaceEvent::CountdownTick { count });

            if count == 0 {
                self.go();
            }
        }
    }

    /// Start the race clock. Time left over in the go step is dropped.
    fn go(&mut self) {
        self.state.countdown.timer = 0.0;
        self.state.clock_s = 0.0;
        self.state.drift_timer = 0.0;
        self.state.set_phase(RacePhase::Racing);
    }

    fn advance_race(&mut self, dt: f64) {
        let step_start = self.state.clock_s;
        self.state.clock_s += dt;

        let track = &self.config.track;
        let mut crossings = Vec::new();

        // Controlled racer: racing only, checked before the AI.
        if self.state.phase == RacePhase::Racing && !self.state.controlled().has_finished() {
            let moved = integrate(self.state.controlled_mut(), &self.config.tuning, track, dt);

            if let Some(index) = reached_checkpoint(&self.state, moved.to) {
                enter_gate(&mut self.state, index);
            } else if let Some(fraction) = moved.crossing_fraction(track.finish()) {
                crossings.push(FinishCrossing {
                    racer_index: CONTROLLED_INDEX,
                    fraction,
                });
            }
        }

        crossings.extend(advance_competitors(&mut self.state, track, dt));
        drift_paces(&mut self.state, &self.config, &mut *self.rng, dt);

        let ranked = assign_finishes(&mut self.state, crossings, step_start, dt);
        if !ranked.is_empty() {
            self.publish_results(&ranked);
        }
    }

    fn publish_results(&mut self, ranked: &[usize]) {
        if ranked.contains(&CONTROLLED_INDEX) {
            self.state.push_event(RaceEvent::Finished);
        }

        let all_finished = self.state.all_finished();
        if self.state.controlled().has_finished() {
            let standings = results::standings(&self.state);
            self.state
                .push_event(RaceEvent::results_updated(standings, all_finished));
        }

        if all_finished {
            self.state.set_phase(RacePhase::Finished);
        }
    }

    /// Move this call's events to the bus and, when polling, the outbox.
    fn flush(&mut self) -> Vec<RaceEvent> {
        let events = self.state.take_events();
        for event in &events {
            self.bus.publish(event.clone());
        }
        if let Some(outbox) = self.outbox.as_mut() {
            outbox.extend(events.iter().cloned());
        }
        events
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RaceEvent> {
        self.bus.subscribe()
    }

    /// Drain events accumulated since the last call.
    ///
    /// Always empty unless the race was built with [`Race::polling`].
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        self.outbox.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Current phase.
    pub fn phase(&self) -> RacePhase {
        self.state.phase
    }

    /// Full race state (read-only).
    pub fn state(&self) -> &RaceState {
        &self.state
    }

    /// Configuration the race was built with.
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// All racers, controlled racer first.
    pub fn racers(&self) -> &[RacerState] {
        &self.state.racers
    }

    /// The host's racer.
    pub fn controlled(&self) -> &RacerState {
        self.state.controlled()
    }

    /// Race clock in milliseconds since go.
    pub fn clock_ms(&self) -> u64 {
        self.state.clock_ms()
    }

    /// Live standings, always available.
    pub fn standings(&self) -> Vec<RaceResult> {
        results::standings(&self.state)
    }

    /// Standings once the controlled racer has finished.
    pub fn partial_results(&self) -> Option<Vec<RaceResult>> {
        results::partial_results(&self.state)
    }

    /// Standings once every racer has finished.
    pub fn complete_results(&self) -> Option<Vec<RaceResult>> {
        results::complete_results(&self.state)
    }

    /// Racer currently in front.
    pub fn leader(&self) -> Option<&RacerState> {
        results::leader(&self.state)
    }

    /// Digest of the full race state.
    pub fn compute_hash(&self) -> StateHash {
        self.state.compute_hash()
    }

    /// Finish recording and return the transcript, stamped with the current
    /// state hash. `None` if the race was not recording.
    pub fn take_transcript(&mut self) -> Option<RaceTranscript> {
        let hash = self.compute_hash();
        self.recorder.take().map(|recorder| recorder.finish(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Countdown;
    use crate::NOMINAL_FRAME_SECONDS;

    fn race() -> Race {
        Race::with_seed(RaceConfig::default(), 42).unwrap()
    }

    /// Tap then run the countdown out.
    fn racing() -> Race {
        let mut race = race();
        race.tap();
        for _ in 0..3 {
            race.step(1.0);
        }
        assert_eq!(race.phase(), RacePhase::Racing);
        race
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let mut config = RaceConfig::default();
        config.tuning.max_velocity = 0.0;
        assert!(matches!(
            Race::with_seed(config, 1),
            Err(ConfigError::NonPositiveMaxVelocity(_))
        ));
    }

    #[test]
    fn test_init_is_silent() {
        let mut race = race().polling();
        assert_eq!(race.phase(), RacePhase::Ready);
        assert!(race.take_events().is_empty());
    }

    #[test]
    fn test_first_tap_starts_countdown() {
        let mut race = race();
        let events = race.tap();
        assert_eq!(
            events,
            vec![
                RaceEvent::StateChanged { state: RacePhase::Countdown },
                RaceEvent::CountdownTick { count: 3 },
            ]
        );
        // No velocity from the starting tap.
        assert_eq!(race.controlled().velocity, 0.0);
    }

    #[test]
    fn test_countdown_sequence() {
        let mut race = race();
        race.tap();

        let mut ticks = Vec::new();
        for _ in 0..20 {
            for event in race.step(0.25).events {
                if let RaceEvent::CountdownTick { count } = event {
                    ticks.push(count);
                }
            }
        }
        assert_eq!(ticks, vec![2, 1, 0]);
        assert_eq!(race.phase(), RacePhase::Racing);
    }

    #[test]
    fn test_go_emits_tick_then_state() {
        let mut race = race();
        race.tap();
        race.step(1.0);
        race.step(1.0);
        let events = race.step(1.0).events;
        assert_eq!(
            events,
            vec![
                RaceEvent::CountdownTick { count: 0 },
                RaceEvent::StateChanged { state: RacePhase::Racing },
            ]
        );
        assert_eq!(race.clock_ms(), 0);
    }

    #[test]
    fn test_taps_ignored_during_countdown() {
        let mut race = race();
        race.tap();
        assert!(race.tap().is_empty());
        assert_eq!(race.phase(), RacePhase::Countdown);
        assert_eq!(race.controlled().velocity, 0.0);
    }

    #[test]
    fn test_zero_countdown_goes_immediately() {
        let config = RaceConfig {
            countdown_from: 0,
            ..Default::default()
        };
        let mut race = Race::with_seed(config, 3).unwrap();
        let events = race.tap();
        assert_eq!(events.last(), Some(&RaceEvent::StateChanged { state: RacePhase::Racing }));
        assert_eq!(race.phase(), RacePhase::Racing);
    }

    #[test]
    fn test_tap_adds_velocity_while_racing() {
        let mut race = racing();
        race.tap();
        assert_eq!(race.controlled().velocity, 15.0);
    }

    #[test]
    fn test_invalid_delta_ignored() {
        let mut race = racing();
        race.tap();
        let before = race.compute_hash();

        race.step(-1.0);
        race.step(f64::NAN);
        race.step(f64::INFINITY);
        race.step(0.0);
        assert_eq!(race.compute_hash(), before);
    }

    #[test]
    fn test_checkpoint_pauses_and_ai_keeps_moving() {
        let mut race = racing();
        let checkpoint = race.state().checkpoints[0].position;
        race.state.controlled_mut().position = checkpoint - 0.1;
        race.tap();

        let events = race.step(NOMINAL_FRAME_SECONDS).events;
        assert_eq!(race.phase(), RacePhase::Paused);
        assert!(events.contains(&RaceEvent::QuizRequested { checkpoint_index: 0 }));
        assert_eq!(race.controlled().position, checkpoint);

        let ai_before: Vec<f64> = race.racers()[1..].iter().map(|r| r.position).collect();
        race.tap();
        race.step(0.5);
        assert_eq!(race.controlled().velocity, 0.0);
        assert_eq!(race.controlled().position, checkpoint);
        for (racer, before) in race.racers()[1..].iter().zip(ai_before) {
            assert!(racer.position > before);
        }
    }

    #[test]
    fn test_clock_runs_while_paused() {
        let mut race = racing();
        let checkpoint = race.state().checkpoints[0].position;
        race.state.controlled_mut().position = checkpoint - 0.1;
        race.tap();
        race.step(0.5);
        assert_eq!(race.phase(), RacePhase::Paused);

        race.step(0.5);
        assert_eq!(race.clock_ms(), 1000);
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut race = racing();
        race.tap();
        for _ in 0..120 {
            race.step(NOMINAL_FRAME_SECONDS);
        }

        let events = race.restart();
        assert_eq!(events, vec![RaceEvent::StateChanged { state: RacePhase::Ready }]);

        let state = race.state();
        assert_eq!(state.phase, RacePhase::Ready);
        assert_eq!(state.round, 1);
        assert_eq!(state.clock_s, 0.0);
        assert_eq!(state.countdown, Countdown::default());
        assert_eq!(state.ledger.next_position(), 1);
        assert!(state.checkpoints.iter().all(|c| !c.passed));
        for racer in &state.racers {
            assert_eq!(racer.position, race.config().track.start());
            assert!(!racer.has_finished());
        }
        assert_eq!(race.controlled().velocity, 0.0);
    }

    #[test]
    fn test_restart_from_ready_announces() {
        let mut race = race();
        assert_eq!(
            race.restart(),
            vec![RaceEvent::StateChanged { state: RacePhase::Ready }]
        );
    }

    #[test]
    fn test_finish_order_and_results() {
        let mut race = racing();
        let finish = race.config().track.finish();

        // Controlled racer one step from the line, AI parked behind.
        race.state.controlled_mut().position = finish - 0.1;
        for cp in race.state.checkpoints.iter_mut() {
            cp.passed = true;
        }
        race.tap();

        let events = race.step(NOMINAL_FRAME_SECONDS).events;
        assert_eq!(race.controlled().finish_position, Some(1));
        assert!(events.contains(&RaceEvent::Finished));
        assert!(matches!(
            events.last(),
            Some(RaceEvent::ResultsUpdated { all_finished: false, .. })
        ));
        assert!(race.partial_results().is_some());
        assert!(race.complete_results().is_none());

        // Taps after finishing do nothing.
        assert!(race.tap().is_empty());

        let mut steps = 0;
        while race.phase() != RacePhase::Finished {
            race.step(0.5);
            steps += 1;
            assert!(steps < 10_000, "AI never finished");
        }

        let complete = race.complete_results().unwrap();
        let positions: Vec<_> = complete.iter().map(|r| r.finish_position).collect();
        let expected: Vec<_> = (1..=complete.len() as u32).map(Some).collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn test_finished_race_is_frozen() {
        let mut race = racing();
        let finish = race.config().track.finish();
        for racer in race.state.racers.iter_mut() {
            racer.position = finish - 0.5;
            racer.velocity = 100.0;
        }
        for cp in race.state.checkpoints.iter_mut() {
            cp.passed = true;
        }

        let result = race.step(NOMINAL_FRAME_SECONDS);
        assert!(result.all_finished);
        assert_eq!(race.phase(), RacePhase::Finished);

        let hash = race.compute_hash();
        race.tap();
        race.step(1.0);
        assert_eq!(race.compute_hash(), hash);
    }

    #[test]
    fn test_subscriber_receives_events() {
        let mut race = race();
        let mut rx = race.subscribe();
        race.tap();

        assert_eq!(
            rx.try_recv().unwrap(),
            RaceEvent::StateChanged { state: RacePhase::Countdown }
        );
        assert_eq!(rx.try_recv().unwrap(), RaceEvent::CountdownTick { count: 3 });
    }

    #[test]
    fn test_outbox_collects_across_calls() {
        let mut race = race().polling();
        race.tap();
        race.step(1.0);
        let events = race.take_events();
        assert_eq!(events.len(), 3);
        assert!(race.take_events().is_empty());

        race.restart();
        assert_eq!(
            race.take_events(),
            vec![RaceEvent::StateChanged { state: RacePhase::Ready }]
        );
    }

    #[test]
    fn test_outbox_off_unless_polling() {
        let mut race = race();
        for _ in 0..1000 {
            race.tap();
            race.step(1.0);
            race.restart();
        }
        assert!(race.take_events().is_empty());
        assert!(race.outbox.is_none());
    }

    #[test]
    fn test_teardown_returns_standings() {
        let race = racing();
        let results = race.teardown();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.finish_position.is_none()));
    }

    #[test]
    fn test_same_seed_same_race() {
        let run = |seed| {
            let mut race = Race::with_seed(RaceConfig::default(), seed).unwrap();
            race.tap();
            for i in 0..600 {
                if i % 5 == 0 {
                    race.tap();
                }
                race.step(NOMINAL_FRAME_SECONDS);
            }
            race.compute_hash()
        };
        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }
}
