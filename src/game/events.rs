//! Race Events
//!
//! The fixed message set exchanged with the host. Inputs flow in as
//! [`HostInput`], notifications flow out as [`RaceEvent`].

use serde::{Deserialize, Serialize};

use crate::game::checkpoint::AnswerOutcome;
use crate::game::results::RaceResult;
use crate::game::state::RacePhase;

// =============================================================================
// HOST -> RACE
// =============================================================================

/// Input signals the host may send.
///
/// Externally tagged so recorded inputs survive bincode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostInput {
    /// Player tapped.
    Tap,
    /// Tear down and rebuild the race in `Ready`.
    Restart,
    /// Quiz answer for the checkpoint the race is paused at.
    AnswerSubmitted {
        /// Whether the chosen answer was right.
        correct: bool,
        /// How long the player took to answer.
        time_taken_ms: u64,
    },
}

impl HostInput {
    /// Answer input from a quiz outcome.
    pub fn answer(outcome: AnswerOutcome) -> Self {
        HostInput::AnswerSubmitted {
            correct: outcome.correct,
            time_taken_ms: outcome.time_taken_ms,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// RACE -> HOST
// =============================================================================

/// Notifications the race publishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RaceEvent {
    /// The race entered a new phase.
    StateChanged {
        /// Phase entered.
        state: RacePhase,
    },

    /// Countdown progress; 0 is "go".
    CountdownTick {
        /// Number announced.
        count: u32,
    },

    /// The controlled racer is held at a checkpoint until an answer arrives.
    QuizRequested {
        /// Index of the checkpoint reached.
        checkpoint_index: usize,
    },

    /// Standings changed after the controlled racer finished.
    ResultsUpdated {
        /// Finished racers by position, then those still running.
        results: Vec<RaceResult>,
        /// Whether every racer has finished.
        all_finished: bool,
    },

    /// The controlled racer crossed the line. Sent once per race.
    Finished,
}

impl RaceEvent {
    /// Build a results notification.
    pub fn results_updated(results: Vec<RaceResult>, all_finished: bool) -> Self {
        RaceEvent::ResultsUpdated {
            results,
            all_finished,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RaceEvent::StateChanged { .. } => "state_changed",
            RaceEvent::CountdownTick { .. } => "countdown_tick",
            RaceEvent::QuizRequested { .. } => "quiz_requested",
            RaceEvent::ResultsUpdated { .. } => "results_updated",
            RaceEvent::Finished => "finished",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
