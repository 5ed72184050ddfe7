//! Competitor AI
//!
//! AI racers run at a randomized pace that drifts every few seconds but
//! never leaves the character's (difficulty-scaled) speed band. They ignore
//! checkpoints and keep running while the controlled racer sits in a quiz.

use rand::RngCore;
use tracing::debug;

use crate::core::rng::{range_f64, shuffle};
use crate::game::config::{CompetitorProfile, RaceConfig};
use crate::game::physics::Displacement;
use crate::game::results::FinishCrossing;
use crate::game::state::{PaceBand, RaceState, RacerState};
use crate::game::track::TrackGeometry;

/// Pick `count` distinct profiles from the pool, in random order.
pub fn select_roster<'a>(
    pool: &'a [CompetitorProfile],
    count: usize,
    rng: &mut dyn RngCore,
) -> Vec<&'a CompetitorProfile> {
    let mut indices: Vec<usize> = (0..pool.len()).collect();
    shuffle(rng, &mut indices);
    indices
        .into_iter()
        .take(count)
        .map(|i| &pool[i])
        .collect()
}

/// Speed band for a profile under the given difficulty.
#[inline]
pub fn pace_band(profile: &CompetitorProfile, difficulty: f64) -> PaceBand {
    PaceBand {
        min: profile.min_speed * difficulty,
        max: profile.max_speed * difficulty,
    }
}

/// Build the AI racers for a new race, lanes starting at `first_lane`.
pub fn spawn_competitors(config: &RaceConfig, rng: &mut dyn RngCore, first_lane: usize) -> Vec<RacerState> {
    let start = config.track.start();

    select_roster(&config.competitor_pool, config.roster_size(), rng)
        .into_iter()
        .enumerate()
        .map(|(i, profile)| {
            let band = pace_band(profile, config.difficulty);
            let speed = range_f64(rng, band.min, band.max);
            debug!(name = %profile.name, speed, "competitor spawned");
            RacerState::competitor(&profile.name, &profile.color, first_lane + i, start, speed, band)
        })
        .collect()
}

/// Move every unfinished AI racer, reporting who crossed the line.
pub fn advance_competitors(state: &mut RaceState, track: &TrackGeometry, dt: f64) -> Vec<FinishCrossing> {
    let finish = track.finish();
    let mut crossings = Vec::new();

    for (index, racer) in state.racers.iter_mut().enumerate() {
        if racer.is_controlled || racer.has_finished() {
            continue;
        }

        let from = racer.position;
        let travel = racer.velocity * dt;
        racer.position = track.clamp(from + travel).max(from);
        let step = Displacement {
            from,
            to: racer.position,
            travel,
        };

        if let Some(fraction) = step.crossing_fraction(finish) {
            crossings.push(FinishCrossing { racer_index: index, fraction });
        }
    }

    crossings
}

/// Nudge every unfinished AI racer's pace once per drift interval.
pub fn drift_paces(state: &mut RaceState, config: &RaceConfig, rng: &mut dyn RngCore, dt: f64) {
    state.drift_timer += dt;
    let amplitude = config.speed_drift * config.difficulty;

    while state.drift_timer >= config.speed_drift_interval_s {
        state.drift_timer -= config.speed_drift_interval_s;

        for racer in state.racers.iter_mut() {
            if racer.has_finished() {
                continue;
            }
            if let Some(band) = racer.pace {
                let nudge = range_f64(rng, -amplitude, amplitude);
                racer.velocity = band.clamp(racer.velocity + nudge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::config::default_competitor_pool;
    use crate::game::state::RacePhase;

    /// Replays a fixed list of raw draws, cycling when exhausted.
    struct ScriptedRng {
        draws: Vec<u64>,
        cursor: usize,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }
        fn next_u64(&mut self) -> u64 {
            let v = self.draws[self.cursor % self.draws.len()];
            self.cursor += 1;
            v
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn test_roster_has_no_duplicates() {
        let pool = default_competitor_pool();
        let mut rng = DeterministicRng::new(77);

        for _ in 0..50 {
            let roster = select_roster(&pool, 4, &mut rng);
            assert_eq!(roster.len(), 4);
            let mut names: Vec<_> = roster.iter().map(|p| p.name.clone()).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), 4);
        }
    }

    #[test]
    fn test_roster_exact_with_scripted_rng() {
        let pool = default_competitor_pool();
        // Every draw of 0 swaps each slot with index 0 during Fisher-Yates.
        let mut rng = ScriptedRng { draws: vec![0], cursor: 0 };
        let roster = select_roster(&pool, 2, &mut rng);

        let names: Vec<_> = roster.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Pip", "Zoom"]);
    }

    #[test]
    fn test_initial_speed_scaled_by_difficulty() {
        let config = RaceConfig {
            difficulty: 2.0,
            competitor_pool: vec![CompetitorProfile::new("Solo", "#ffffff", 10.0, 20.0)],
            max_competitors: 1,
            ..Default::default()
        };
        // Zero draw -> bottom of the band.
        let mut rng = ScriptedRng { draws: vec![0], cursor: 0 };
        let racers = spawn_competitors(&config, &mut rng, 1);

        assert_eq!(racers.len(), 1);
        assert_eq!(racers[0].velocity, 20.0);
        assert_eq!(racers[0].pace, Some(PaceBand { min: 20.0, max: 40.0 }));
        assert_eq!(racers[0].lane, 1);
    }

    #[test]
    fn test_drift_stays_in_band() {
        let config = RaceConfig {
            speed_drift: 50.0,
            ..Default::default()
        };
        let mut rng = DeterministicRng::new(2024);
        let mut state = RaceState::setup(&config, &mut rng, 0);
        state.phase = RacePhase::Racing;

        for _ in 0..500 {
            drift_paces(&mut state, &config, &mut rng, 0.5);
            for racer in state.racers.iter().filter(|r| !r.is_controlled) {
                let band = racer.pace.expect("AI racer has a pace band");
                assert!(band.contains(racer.velocity));
            }
        }
    }

    #[test]
    fn test_drift_waits_for_interval() {
        let config = RaceConfig::default();
        let mut rng = DeterministicRng::new(9);
        let mut state = RaceState::setup(&config, &mut rng, 0);
        let before: Vec<f64> = state.racers.iter().map(|r| r.velocity).collect();

        drift_paces(&mut state, &config, &mut rng, 1.9);
        let after: Vec<f64> = state.racers.iter().map(|r| r.velocity).collect();
        assert_eq!(before, after);
        assert!((state.drift_timer - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_advance_reports_finish_crossing() {
        let config = RaceConfig::default();
        let mut rng = DeterministicRng::new(11);
        let mut state = RaceState::setup(&config, &mut rng, 0);
        let finish = config.track.finish();

        state.racers[1].position = finish - 10.0;
        state.racers[1].velocity = 40.0;

        let crossings = advance_competitors(&mut state, &config.track, 0.5);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].racer_index, 1);
        // 10 units to go out of 20 travelled.
        assert!((crossings[0].fraction - 0.5).abs() < 1e-9);
        assert_eq!(state.racers[1].position, finish);

        // Controlled racer is never moved here.
        assert_eq!(state.racers[0].position, config.track.start());
    }
}
