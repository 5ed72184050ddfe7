//! Checkpoint Gate
//!
//! Holds the controlled racer at each checkpoint until the host reports a
//! quiz answer, then releases it with a velocity that depends on how well
//! the quiz went.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::config::PhysicsTuning;
use crate::game::events::RaceEvent;
use crate::game::state::{RacePhase, RaceState};

/// Outcome of a checkpoint quiz as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    /// Whether the chosen answer was right.
    pub correct: bool,
    /// How long the player took to answer.
    pub time_taken_ms: u64,
}

/// Velocity the controlled racer resumes with after a quiz, capped at the
/// configured maximum.
pub fn resume_velocity(outcome: &AnswerOutcome, tuning: &PhysicsTuning) -> f64 {
    let boost = match outcome {
        AnswerOutcome { correct: false, .. } => 0.0,
        AnswerOutcome { time_taken_ms, .. } if *time_taken_ms < tuning.fast_answer_threshold_ms => {
            tuning.fast_answer_boost
        }
        _ => tuning.slow_answer_boost,
    };
    boost.min(tuning.max_velocity)
}

/// First unpassed checkpoint at or behind `position`.
pub fn reached_checkpoint(state: &RaceState, position: f64) -> Option<usize> {
    state
        .checkpoints
        .iter()
        .position(|cp| !cp.passed && position >= cp.position)
}

/// Close the gate: mark the checkpoint passed, stop the racer on it, pause
/// the race and ask the host for a quiz.
pub fn enter_gate(state: &mut RaceState, index: usize) {
    let checkpoint_position = {
        let checkpoint = &mut state.checkpoints[index];
        checkpoint.passed = true;
        checkpoint.position
    };

    let racer = state.controlled_mut();
    racer.velocity = 0.0;
    racer.position = racer.position.min(checkpoint_position);

    info!(checkpoint = index, position = checkpoint_position, "checkpoint reached");
    state.set_phase(RacePhase::Paused);
    state.push_event(RaceEvent::QuizRequested {
        checkpoint_index: index,
    });
}

/// Apply a quiz answer. Ignored unless the race is paused at a gate.
///
/// Returns whether the answer was accepted.
pub fn resolve_answer(state: &mut RaceState, tuning: &PhysicsTuning, outcome: AnswerOutcome) -> bool {
    if state.phase != RacePhase::Paused {
        debug!(phase = %state.phase, "answer ignored outside checkpoint pause");
        return false;
    }

    let velocity = resume_velocity(&outcome, tuning);
    state.controlled_mut().velocity = velocity;
    info!(
        correct = outcome.correct,
        time_taken_ms = outcome.time_taken_ms,
        velocity,
        "checkpoint answered"
    );
    state.set_phase(RacePhase::Racing);
    true
}
