//! Results Aggregator
//!
//! One counter hands out finish positions in true crossing order. Result
//! views are plain reads over the racers and never mutate anything.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::state::{RaceState, RacerState};

/// Monotonic finish-position counter shared by every racer in a race.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishLedger {
    next_position: u32,
}

impl Default for FinishLedger {
    fn default() -> Self {
        Self { next_position: 1 }
    }
}

impl FinishLedger {
    /// The position the next finisher will receive.
    #[inline]
    pub fn next_position(&self) -> u32 {
        self.next_position
    }

    /// Number of positions handed out so far.
    #[inline]
    pub fn finished_count(&self) -> u32 {
        self.next_position - 1
    }

    /// Record a racer's finish. A racer that already holds a position keeps
    /// it and the counter does not move.
    pub fn record(&mut self, racer: &mut RacerState, finish_time_ms: u64) -> Option<u32> {
        if racer.has_finished() {
            debug!(name = %racer.name, "duplicate finish ignored");
            return None;
        }
        let position = self.next_position;
        self.next_position += 1;
        racer.finish_position = Some(position);
        racer.finish_time_ms = Some(finish_time_ms);
        Some(position)
    }
}

/// A racer reaching the finish line partway through a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinishCrossing {
    /// Index into `RaceState::racers`.
    pub racer_index: usize,
    /// Fraction of the step elapsed at the crossing, in [0, 1].
    pub fraction: f64,
}

/// Assign finish positions for every crossing in one step.
///
/// Crossings are ranked by when they happened inside the step; exact ties
/// go to the lower racer index (controlled racer first). Returns the racer
/// indices that were newly ranked, in rank order.
pub fn assign_finishes(
    state: &mut RaceState,
    mut crossings: Vec<FinishCrossing>,
    step_start_s: f64,
    dt: f64,
) -> Vec<usize> {
    crossings.sort_by(|a, b| {
        a.fraction
            .total_cmp(&b.fraction)
            .then(a.racer_index.cmp(&b.racer_index))
    });

    let mut ranked = Vec::with_capacity(crossings.len());
    for crossing in crossings {
        let at_s = step_start_s + crossing.fraction * dt;
        let finish_time_ms = (at_s * 1000.0).round() as u64;

        let racer = &mut state.racers[crossing.racer_index];
        if let Some(position) = state.ledger.record(racer, finish_time_ms) {
            info!(name = %racer.name, position, finish_time_ms, "racer finished");
            ranked.push(crossing.racer_index);
        }
    }
    ranked
}

/// One racer's line in a result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    /// Display name.
    pub name: String,
    /// Display color / avatar reference.
    pub color: String,
    /// Race clock at the finish crossing.
    pub finish_time_ms: Option<u64>,
    /// 1-based finishing rank.
    pub finish_position: Option<u32>,
    /// Whether this is the host's racer.
    pub is_controlled: bool,
}

impl From<&RacerState> for RaceResult {
    fn from(racer: &RacerState) -> Self {
        Self {
            name: racer.name.clone(),
            color: racer.color.clone(),
            finish_time_ms: racer.finish_time_ms,
            finish_position: racer.finish_position,
            is_controlled: racer.is_controlled,
        }
    }
}

/// Finished racers by position, then everyone still running in lane order.
pub fn standings(state: &RaceState) -> Vec<RaceResult> {
    let mut finished: Vec<&RacerState> = state.racers.iter().filter(|r| r.has_finished()).collect();
    finished.sort_by_key(|r| r.finish_position);

    finished
        .into_iter()
        .chain(state.racers.iter().filter(|r| !r.has_finished()))
        .map(RaceResult::from)
        .collect()
}

/// Partial view, available once the controlled racer has finished.
pub fn partial_results(state: &RaceState) -> Option<Vec<RaceResult>> {
    if !state.controlled().has_finished() {
        return None;
    }
    Some(standings(state))
}

/// Complete view, available once every racer has finished.
pub fn complete_results(state: &RaceState) -> Option<Vec<RaceResult>> {
    if !state.all_finished() {
        return None;
    }
    Some(standings(state))
}

/// Racer furthest down the track (lowest index on ties).
pub fn leader(state: &RaceState) -> Option<&RacerState> {
    state.racers.iter().reduce(|best, r| {
        let ahead = match (r.finish_position, best.finish_position) {
            (Some(a), Some(b)) => a < b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => r.position > best.position,
        };
        if ahead {
            r
        } else {
            best
        }
    })
}
