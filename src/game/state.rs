//! Race State Definitions
//!
//! All entities a race mutates: racers, checkpoints, the finish ledger and
//! the phase. Racers live in a `Vec` with the controlled racer at index 0,
//! which is also the stable tie-break order.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::game::competitor::spawn_competitors;
use crate::game::config::RaceConfig;
use crate::game::events::RaceEvent;
use crate::game::results::FinishLedger;

/// Index of the controlled racer in `RaceState::racers`.
pub const CONTROLLED_INDEX: usize = 0;

// =============================================================================
// RACE PHASE
// =============================================================================

/// Current phase of the race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RacePhase {
    /// Waiting for the first tap.
    #[default]
    Ready = 0,
    /// Counting down to go.
    Countdown = 1,
    /// Everyone moving.
    Racing = 2,
    /// Controlled racer held at a checkpoint quiz; AI keeps moving.
    Paused = 3,
    /// Every racer has finished; state is frozen.
    Finished = 4,
}

impl RacePhase {
    /// Phases in which the race clock runs and competitors move.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, RacePhase::Racing | RacePhase::Paused)
    }
}

impl std::fmt::Display for RacePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RacePhase::Ready => "ready",
            RacePhase::Countdown => "countdown",
            RacePhase::Racing => "racing",
            RacePhase::Paused => "paused",
            RacePhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

// =============================================================================
// RACER STATE
// =============================================================================

/// Speed bounds an AI racer's pace is kept within (difficulty already applied).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaceBand {
    /// Slowest allowed pace.
    pub min: f64,
    /// Fastest allowed pace.
    pub max: f64,
}

impl PaceBand {
    /// Clamp a speed into the band.
    #[inline]
    pub fn clamp(&self, speed: f64) -> f64 {
        speed.max(self.min).min(self.max)
    }

    /// Whether a speed lies inside the band.
    #[inline]
    pub fn contains(&self, speed: f64) -> bool {
        speed >= self.min && speed <= self.max
    }
}

/// State of a single racer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RacerState {
    /// Display name.
    pub name: String,
    /// Display color / avatar reference.
    pub color: String,
    /// Lane index.
    pub lane: usize,
    /// Track position, between start and finish.
    pub position: f64,
    /// Tap velocity for the controlled racer, current pace for AI racers.
    pub velocity: f64,
    /// Pace bounds (AI racers only).
    pub pace: Option<PaceBand>,
    /// Race clock at the finish crossing.
    pub finish_time_ms: Option<u64>,
    /// 1-based finishing rank.
    pub finish_position: Option<u32>,
    /// Whether this is the host's racer.
    pub is_controlled: bool,
}

impl RacerState {
    /// Create the controlled racer at the start line.
    pub fn controlled(name: &str, color: &str, lane: usize, start: f64) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            lane,
            position: start,
            velocity: 0.0,
            pace: None,
            finish_time_ms: None,
            finish_position: None,
            is_controlled: true,
        }
    }

    /// Create an AI racer at the start line with an initial pace.
    pub fn competitor(name: &str, color: &str, lane: usize, start: f64, speed: f64, pace: PaceBand) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            lane,
            position: start,
            velocity: speed,
            pace: Some(pace),
            finish_time_ms: None,
            finish_position: None,
            is_controlled: false,
        }
    }

    /// Has this racer crossed the finish line?
    #[inline]
    pub fn has_finished(&self) -> bool {
        self.finish_position.is_some()
    }

    /// Hash this racer's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(&self.name);
        hasher.update_u32(self.lane as u32);
        hasher.update_f64(self.position);
        hasher.update_f64(self.velocity);
        hasher.update_bool(self.is_controlled);
        hasher.update_opt_u32(self.finish_position);
        hasher.update_u64(self.finish_time_ms.unwrap_or(u64::MAX));
    }
}

// =============================================================================
// CHECKPOINT
// =============================================================================

/// A quiz gate on the controlled racer's path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Ratio of the start-to-finish span, in (0, 1).
    pub ratio: f64,
    /// Absolute track position.
    pub position: f64,
    /// Flips false -> true once per race.
    pub passed: bool,
}

// =============================================================================
// COUNTDOWN
// =============================================================================

/// Scheduled countdown progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    /// Last number announced.
    pub remaining: u32,
    /// Seconds accumulated toward the next tick.
    pub timer: f64,
}

// =============================================================================
// RACE STATE
// =============================================================================

/// Every entity of one race instance. Recreated wholesale on restart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaceState {
    /// Current phase.
    pub phase: RacePhase,
    /// Number of restarts since init.
    pub round: u32,
    /// All racers; controlled racer first.
    pub racers: Vec<RacerState>,
    /// Checkpoints in track order.
    pub checkpoints: Vec<Checkpoint>,
    /// Finish position counter.
    pub ledger: FinishLedger,
    /// Countdown progress.
    pub countdown: Countdown,
    /// Seconds since go (runs while racing or paused).
    pub clock_s: f64,
    /// Seconds accumulated toward the next AI pace nudge.
    pub drift_timer: f64,
    /// Events generated by the current call (drained by the race).
    #[serde(skip)]
    pub pending_events: Vec<RaceEvent>,
}

impl RaceState {
    /// Build a fresh race at the start line in `Ready`.
    ///
    /// The AI roster and its paces are drawn from `rng`.
    pub fn setup(config: &RaceConfig, rng: &mut dyn RngCore, round: u32) -> Self {
        let track = &config.track;
        let start = track.start();

        let mut racers = Vec::with_capacity(1 + config.roster_size());
        racers.push(RacerState::controlled(
            &config.controlled_name,
            &config.controlled_color,
            CONTROLLED_INDEX,
            start,
        ));
        racers.extend(spawn_competitors(config, rng, 1));

        let checkpoints = track
            .checkpoint_ratios
            .iter()
            .zip(track.checkpoint_positions())
            .map(|(&ratio, position)| Checkpoint {
                ratio,
                position,
                passed: false,
            })
            .collect();

        Self {
            phase: RacePhase::Ready,
            round,
            racers,
            checkpoints,
            ledger: FinishLedger::default(),
            countdown: Countdown::default(),
            clock_s: 0.0,
            drift_timer: 0.0,
            pending_events: Vec::new(),
        }
    }

    /// The host's racer.
    #[inline]
    pub fn controlled(&self) -> &RacerState {
        &self.racers[CONTROLLED_INDEX]
    }

    /// The host's racer, mutably.
    #[inline]
    pub fn controlled_mut(&mut self) -> &mut RacerState {
        &mut self.racers[CONTROLLED_INDEX]
    }

    /// Race clock in whole milliseconds.
    #[inline]
    pub fn clock_ms(&self) -> u64 {
        (self.clock_s * 1000.0).round() as u64
    }

    /// Have all racers crossed the line?
    pub fn all_finished(&self) -> bool {
        self.racers.iter().all(RacerState::has_finished)
    }

    /// Move to a new phase, announcing it. Returns false if already there.
    pub fn set_phase(&mut self, phase: RacePhase) -> bool {
        if self.phase == phase {
            return false;
        }
        tracing::info!(from = %self.phase, to = %phase, "race phase changed");
        self.phase = phase;
        self.push_event(RaceEvent::StateChanged { state: phase });
        true
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.clock_ms(), self.round, |hasher| {
            hasher.update_u8(self.phase as u8);
            hasher.update_u32(self.countdown.remaining);
            hasher.update_f64(self.clock_s);
            hasher.update_f64(self.drift_timer);
            hasher.update_u32(self.ledger.next_position());

            for racer in &self.racers {
                racer.hash_into(hasher);
            }

            for checkpoint in &self.checkpoints {
                hasher.update_f64(checkpoint.position);
                hasher.update_bool(checkpoint.passed);
            }
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a race event.
    pub fn push_event(&mut self, event: RaceEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;

    #[test]
    fn test_setup_places_everyone_on_start() {
        let config = RaceConfig::default();
        let mut rng = DeterministicRng::new(7);
        let state = RaceState::setup(&config, &mut rng, 0);

        assert_eq!(state.phase, RacePhase::Ready);
        assert_eq!(state.racers.len(), 1 + config.roster_size());
        assert!(state.controlled().is_controlled);
        assert_eq!(state.racers.iter().filter(|r| r.is_controlled).count(), 1);

        for (lane, racer) in state.racers.iter().enumerate() {
            assert_eq!(racer.lane, lane);
            assert_eq!(racer.position, config.track.start());
            assert!(!racer.has_finished());
        }
        assert!(state.checkpoints.iter().all(|c| !c.passed));
    }

    #[test]
    fn test_setup_determinism() {
        let config = RaceConfig::default();
        let state1 = RaceState::setup(&config, &mut DeterministicRng::new(12345), 0);
        let state2 = RaceState::setup(&config, &mut DeterministicRng::new(12345), 0);

        assert_eq!(state1.racers, state2.racers);
        assert_eq!(state1.compute_hash(), state2.compute_hash());
    }

    #[test]
    fn test_set_phase_emits_once() {
        let config = RaceConfig::default();
        let mut state = RaceState::setup(&config, &mut DeterministicRng::new(1), 0);

        assert!(state.set_phase(RacePhase::Countdown));
        assert!(!state.set_phase(RacePhase::Countdown));

        let events = state.take_events();
        assert_eq!(events, vec![RaceEvent::StateChanged { state: RacePhase::Countdown }]);
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_hash_tracks_position() {
        let config = RaceConfig::default();
        let mut state = RaceState::setup(&config, &mut DeterministicRng::new(3), 0);
        let before = state.compute_hash();

        state.controlled_mut().position += 1.0;
        assert_ne!(before, state.compute_hash());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RacePhase::Paused.to_string(), "paused");
        assert!(RacePhase::Paused.is_live());
        assert!(!RacePhase::Countdown.is_live());
    }
}
