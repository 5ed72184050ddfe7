//! Player Physics Integrator
//!
//! Tap energy goes in as velocity, friction bleeds it out, and position is
//! integrated each step. Only the controlled racer uses this model.

use crate::game::config::PhysicsTuning;
use crate::game::state::RacerState;
use crate::game::track::TrackGeometry;
use crate::NOMINAL_FRAME_SECONDS;

/// Positions before and after one integration step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Displacement {
    /// Position at the start of the step.
    pub from: f64,
    /// Position at the end of the step, after clamping.
    pub to: f64,
    /// Distance the racer's speed would have covered, ignoring clamps.
    pub travel: f64,
}

impl Displacement {
    /// Fraction of the step at which `mark` was reached, if it was crossed.
    ///
    /// A racer sitting exactly on `mark` at the start of the step does not
    /// cross it again.
    pub fn crossing_fraction(&self, mark: f64) -> Option<f64> {
        if self.from >= mark || self.to < mark || self.travel <= 0.0 {
            return None;
        }
        Some(((mark - self.from) / self.travel).clamp(0.0, 1.0))
    }
}

/// Friction multiplier for a step of `dt` seconds.
///
/// `friction` is defined per nominal 1/60 s frame, so the decay is the same
/// whatever rate the host steps at.
#[inline]
pub fn decay_factor(friction: f64, dt: f64) -> f64 {
    friction.powf(dt / NOMINAL_FRAME_SECONDS)
}

/// Add one tap of velocity, capped at the configured maximum.
pub fn apply_tap(racer: &mut RacerState, tuning: &PhysicsTuning) {
    racer.velocity = (racer.velocity + tuning.tap_boost).min(tuning.max_velocity);
}

/// Decay velocity, snap near-zero to rest, then integrate position.
pub fn integrate(
    racer: &mut RacerState,
    tuning: &PhysicsTuning,
    track: &TrackGeometry,
    dt: f64,
) -> Displacement {
    let from = racer.position;

    let mut velocity = racer.velocity * decay_factor(tuning.friction, dt);
    if velocity < tuning.rest_epsilon {
        velocity = 0.0;
    }
    racer.velocity = velocity.min(tuning.max_velocity);

    let travel = racer.velocity * dt;
    // Clamp keeps position inside the course and never moves it backwards.
    racer.position = track.clamp(from + travel).max(from);

    Displacement {
        from,
        to: racer.position,
        travel,
    }
}
