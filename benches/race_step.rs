//! Step throughput for a full race and for a single racing frame.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tap_race::game::state::RacePhase;
use tap_race::{AnswerOutcome, Race, RaceConfig, NOMINAL_FRAME_SECONDS};

fn racing_race(seed: u64) -> Race {
    let mut race = Race::with_seed(RaceConfig::default(), seed).expect("default config is valid");
    race.tap();
    race.step(3.0);
    race
}

fn full_race(seed: u64) -> Race {
    let mut race = racing_race(seed);
    let mut frame = 0u32;
    while race.phase() != RacePhase::Finished && frame < 60 * 600 {
        if race.phase() == RacePhase::Paused {
            race.submit_answer(AnswerOutcome { correct: true, time_taken_ms: 1000 });
        } else if frame % 3 == 0 {
            race.tap();
        }
        race.step(NOMINAL_FRAME_SECONDS);
        frame += 1;
    }
    race
}

fn bench_single_step(c: &mut Criterion) {
    c.bench_function("race_step_frame", |b| {
        let mut race = racing_race(7);
        b.iter(|| {
            race.tap();
            black_box(race.step(black_box(NOMINAL_FRAME_SECONDS)))
        })
    });
}

fn bench_full_race(c: &mut Criterion) {
    c.bench_function("race_full_headless", |b| {
        b.iter(|| black_box(full_race(black_box(42)).compute_hash()))
    });
}

fn bench_state_hash(c: &mut Criterion) {
    let race = racing_race(3);
    c.bench_function("race_compute_hash", |b| b.iter(|| black_box(race.compute_hash())));
}

criterion_group!(benches, bench_single_step, bench_full_race, bench_state_hash);
criterion_main!(benches);
