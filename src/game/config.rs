//! Race Configuration
//!
//! Everything the host supplies at setup. Validated once in `Race::init`;
//! a bad configuration is a host bug, so it fails fast with `ConfigError`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::track::TrackGeometry;

/// Velocity tuning for the controlled racer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsTuning {
    /// Velocity added per tap (units/s).
    pub tap_boost: f64,
    /// Velocity cap (units/s).
    pub max_velocity: f64,
    /// Multiplicative decay applied once per nominal 1/60 s frame.
    pub friction: f64,
    /// Velocities below this snap to zero.
    pub rest_epsilon: f64,
    /// Velocity granted for a fast correct answer.
    pub fast_answer_boost: f64,
    /// Velocity granted for a slow correct answer.
    pub slow_answer_boost: f64,
    /// Correct answers strictly below this are "fast".
    pub fast_answer_threshold_ms: u64,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            tap_boost: 15.0,
            max_velocity: 200.0,
            friction: 0.98,
            rest_epsilon: 0.5,
            fast_answer_boost: 50.0,
            slow_answer_boost: 25.0,
            fast_answer_threshold_ms: 3000,
        }
    }
}

/// A selectable AI character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    /// Display name.
    pub name: String,
    /// Display color / avatar reference.
    pub color: String,
    /// Slowest pace before difficulty scaling (units/s).
    pub min_speed: f64,
    /// Fastest pace before difficulty scaling (units/s).
    pub max_speed: f64,
}

impl CompetitorProfile {
    /// Create a profile.
    pub fn new(name: &str, color: &str, min_speed: f64, max_speed: f64) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            min_speed,
            max_speed,
        }
    }
}

/// Built-in character roster.
pub fn default_competitor_pool() -> Vec<CompetitorProfile> {
    vec![
        CompetitorProfile::new("Dash", "#e74c3c", 48.0, 66.0),
        CompetitorProfile::new("Pip", "#f1c40f", 40.0, 58.0),
        CompetitorProfile::new("Zoom", "#2ecc71", 52.0, 70.0),
        CompetitorProfile::new("Milo", "#9b59b6", 36.0, 54.0),
        CompetitorProfile::new("Skye", "#1abc9c", 44.0, 62.0),
        CompetitorProfile::new("Rex", "#e67e22", 42.0, 64.0),
    ]
}

/// Complete race setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Track layout.
    pub track: TrackGeometry,
    /// Controlled racer velocity constants.
    pub tuning: PhysicsTuning,
    /// Global AI speed multiplier.
    pub difficulty: f64,
    /// Characters the AI roster is drawn from.
    pub competitor_pool: Vec<CompetitorProfile>,
    /// Upper bound on AI racers per race.
    pub max_competitors: usize,
    /// Seconds between AI pace nudges.
    pub speed_drift_interval_s: f64,
    /// Largest pace nudge (units/s, before difficulty scaling).
    pub speed_drift: f64,
    /// Seconds between countdown ticks.
    pub countdown_interval_s: f64,
    /// First countdown number (counts down to 0 = go).
    pub countdown_from: u32,
    /// Controlled racer display name.
    pub controlled_name: String,
    /// Controlled racer display color.
    pub controlled_color: String,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track: TrackGeometry::default(),
            tuning: PhysicsTuning::default(),
            difficulty: 1.0,
            competitor_pool: default_competitor_pool(),
            max_competitors: 3,
            speed_drift_interval_s: 2.0,
            speed_drift: 6.0,
            countdown_interval_s: 1.0,
            countdown_from: 3,
            controlled_name: "You".to_string(),
            controlled_color: "#3498db".to_string(),
        }
    }
}

impl RaceConfig {
    /// Number of AI racers a race will field.
    pub fn roster_size(&self) -> usize {
        self.max_competitors.min(self.competitor_pool.len())
    }

    /// Check every setup invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tuning;
        if !(t.max_velocity > 0.0) {
            return Err(ConfigError::NonPositiveMaxVelocity(t.max_velocity));
        }
        if !(t.tap_boost > 0.0) {
            return Err(ConfigError::NonPositiveTapBoost(t.tap_boost));
        }
        if !(t.friction > 0.0 && t.friction < 1.0) {
            return Err(ConfigError::FrictionOutOfRange(t.friction));
        }
        if t.rest_epsilon < 0.0 || t.fast_answer_boost < 0.0 || t.slow_answer_boost < 0.0 {
            return Err(ConfigError::NegativeTuning);
        }
        // One tap from rest must survive a nominal frame of friction.
        if t.tap_boost * t.friction <= t.rest_epsilon {
            return Err(ConfigError::TapBelowRest {
                tap_boost: t.tap_boost,
                rest_epsilon: t.rest_epsilon,
            });
        }

        let track = &self.track;
        if !(track.length > 0.0) || !(track.finish_ratio > track.start_ratio) {
            return Err(ConfigError::EmptyCourse {
                start: track.start_ratio,
                finish: track.finish_ratio,
            });
        }
        let mut prev = 0.0;
        for (index, &ratio) in track.checkpoint_ratios.iter().enumerate() {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(ConfigError::CheckpointOutOfRange { index, ratio });
            }
            if ratio <= prev {
                return Err(ConfigError::CheckpointsNotAscending { index });
            }
            prev = ratio;
        }

        if self.competitor_pool.is_empty() {
            return Err(ConfigError::EmptyCompetitorPool);
        }
        for profile in &self.competitor_pool {
            if !(profile.min_speed > 0.0) || profile.max_speed < profile.min_speed {
                return Err(ConfigError::InvalidSpeedRange {
                    name: profile.name.clone(),
                    min: profile.min_speed,
                    max: profile.max_speed,
                });
            }
        }
        if !(self.difficulty > 0.0) {
            return Err(ConfigError::NonPositiveDifficulty(self.difficulty));
        }

        let racers = 1 + self.roster_size();
        if track.lane_count < racers {
            return Err(ConfigError::NotEnoughLanes {
                lanes: track.lane_count,
                racers,
            });
        }

        if !(self.speed_drift_interval_s > 0.0) || self.speed_drift < 0.0 {
            return Err(ConfigError::InvalidDrift);
        }
        if !(self.countdown_interval_s > 0.0) {
            return Err(ConfigError::NonPositiveCountdownInterval(self.countdown_interval_s));
        }

        Ok(())
    }
}

/// Setup-time configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Max velocity must be positive.
    #[error("max velocity must be positive, got {0}")]
    NonPositiveMaxVelocity(f64),

    /// Tap boost must be positive.
    #[error("tap boost must be positive, got {0}")]
    NonPositiveTapBoost(f64),

    /// Friction must lie strictly between 0 and 1.
    #[error("friction factor must be in (0, 1), got {0}")]
    FrictionOutOfRange(f64),

    /// Epsilon and answer boosts must not be negative.
    #[error("rest epsilon and answer boosts must not be negative")]
    NegativeTuning,

    /// A single tap decays to rest before it moves the racer.
    #[error("tap boost {tap_boost} does not survive one frame above rest epsilon {rest_epsilon}")]
    TapBelowRest {
        /// Configured tap boost.
        tap_boost: f64,
        /// Configured rest epsilon.
        rest_epsilon: f64,
    },

    /// Finish line is not after the start line.
    #[error("finish ratio {finish} must be after start ratio {start} on a positive-length track")]
    EmptyCourse {
        /// Start ratio.
        start: f64,
        /// Finish ratio.
        finish: f64,
    },

    /// Checkpoint ratio outside (0, 1).
    #[error("checkpoint {index} ratio {ratio} must be in (0, 1)")]
    CheckpointOutOfRange {
        /// Checkpoint index.
        index: usize,
        /// Offending ratio.
        ratio: f64,
    },

    /// Checkpoints out of order or duplicated.
    #[error("checkpoint {index} is not after the previous checkpoint")]
    CheckpointsNotAscending {
        /// Checkpoint index.
        index: usize,
    },

    /// No AI characters to choose from.
    #[error("competitor pool is empty")]
    EmptyCompetitorPool,

    /// Profile speed range is empty or non-positive.
    #[error("competitor {name} has invalid speed range [{min}, {max}]")]
    InvalidSpeedRange {
        /// Profile name.
        name: String,
        /// Minimum speed.
        min: f64,
        /// Maximum speed.
        max: f64,
    },

    /// Difficulty multiplier must be positive.
    #[error("difficulty multiplier must be positive, got {0}")]
    NonPositiveDifficulty(f64),

    /// Not enough lanes for controlled racer plus roster.
    #[error("{lanes} lanes cannot hold {racers} racers")]
    NotEnoughLanes {
        /// Configured lanes.
        lanes: usize,
        /// Racers that need a lane.
        racers: usize,
    },

    /// Drift interval must be positive and drift non-negative.
    #[error("speed drift interval must be positive and drift non-negative")]
    InvalidDrift,

    /// Countdown interval must be positive.
    #[error("countdown interval must be positive, got {0}")]
    NonPositiveCountdownInterval(f64),
}
