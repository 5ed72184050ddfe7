//! Tap Race Demo
//!
//! Runs a seeded race headless with a scripted tapper and an arithmetic quiz,
//! then replays the recorded transcript and checks the digest matches.

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tap_race::{
    core::rng::{index_below, shuffle, DeterministicRng},
    game::{RaceConfig, RaceEvent, RacePhase},
    replay::{verify, RaceTranscript},
    surface::{MathProblem, QuizProvider, RaceHost},
    Race, NOMINAL_FRAME_SECONDS, VERSION,
};

/// Seed for the demo race.
const DEMO_SEED: u64 = 12345;

/// Give up after this many simulated seconds.
const MAX_RACE_SECONDS: f64 = 180.0;

/// Player taps once every this many frames.
const TAP_EVERY_FRAMES: u64 = 4;

/// Log a progress line this often.
const STATUS_EVERY_FRAMES: u64 = 300;

/// Player takes this long to read a question.
const THINK_FRAMES: u64 = 45;

/// Small addition problems with three shuffled choices.
struct ArithmeticQuiz {
    rng: DeterministicRng,
}

impl QuizProvider for ArithmeticQuiz {
    fn next_problem(&mut self, _checkpoint_index: usize) -> MathProblem {
        let a = 1 + index_below(&mut self.rng, 12) as i64;
        let b = 1 + index_below(&mut self.rng, 12) as i64;
        let answer = a + b;

        let mut choices = vec![answer, answer + 1 + index_below(&mut self.rng, 3) as i64, answer - 1];
        shuffle(&mut self.rng, &mut choices);

        MathProblem {
            prompt: format!("{} + {}", a, b),
            choices,
            answer,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Tap Race v{}", VERSION);

    let transcript = demo_race()?;
    verify_transcript(&transcript)
}

/// Play one race to completion and return its transcript.
fn demo_race() -> anyhow::Result<RaceTranscript> {
    info!("=== Starting Demo Race ===");
    info!("Seed: {}", DEMO_SEED);

    let race = Race::recorded(RaceConfig::default(), DEMO_SEED)?;
    let quiz = ArithmeticQuiz {
        rng: DeterministicRng::new(DEMO_SEED ^ 0x5eed),
    };
    let mut host = RaceHost::silent(race, quiz);

    host.tap();
    let mut frame: u64 = 0;
    let mut thinking: u64 = 0;
    let max_frames = (MAX_RACE_SECONDS / NOMINAL_FRAME_SECONDS) as u64;

    while host.race().phase() != RacePhase::Finished {
        if frame >= max_frames {
            bail!("race did not finish within {} simulated seconds", MAX_RACE_SECONDS);
        }

        if let Some(quiz) = host.pending_quiz() {
            thinking += 1;
            if thinking >= THINK_FRAMES {
                // Miss the second question on purpose.
                let choice = if quiz.checkpoint_index == 1 {
                    quiz.problem.answer + 100
                } else {
                    quiz.problem.answer
                };
                let time_taken_ms = (thinking as f64 * NOMINAL_FRAME_SECONDS * 1000.0) as u64;
                host.answer(choice, time_taken_ms);
                thinking = 0;
            }
        } else if frame % TAP_EVERY_FRAMES == 0 {
            host.tap();
        }

        let result = host.step(NOMINAL_FRAME_SECONDS);
        for event in &result.events {
            match event {
                RaceEvent::QuizRequested { checkpoint_index } => {
                    if let Some(quiz) = host.pending_quiz() {
                        info!("Checkpoint {}: {} = ? {:?}", checkpoint_index, quiz.problem.prompt, quiz.problem.choices);
                    }
                }
                RaceEvent::Finished => {
                    info!("Crossed the line at {} ms", host.race().controlled().finish_time_ms.unwrap_or_default());
                }
                _ => {}
            }
        }
        frame += 1;

        if frame % STATUS_EVERY_FRAMES == 0 {
            let race = host.race();
            if let Some(leader) = race.leader() {
                info!(
                    "t={:.1}s leader {} at {:.0}%, you at {:.0}%",
                    race.clock_ms() as f64 / 1000.0,
                    leader.name,
                    race.config().track.progress(leader.position) * 100.0,
                    race.config().track.progress(race.controlled().position) * 100.0
                );
            }
        }
    }

    info!("=== Race Results ===");
    for result in host.race().complete_results().unwrap_or_default() {
        info!(
            "#{} {}{} - {} ms",
            result.finish_position.unwrap_or_default(),
            result.name,
            if result.is_controlled { " (you)" } else { "" },
            result.finish_time_ms.unwrap_or_default()
        );
    }

    let mut race = host.into_race();
    let transcript = race
        .take_transcript()
        .context("demo race was not recording")?;
    let results = race.teardown();
    info!("Racers: {}, steps recorded: {}", results.len(), transcript.steps.len());

    Ok(transcript)
}

/// Round-trip the transcript through bincode and replay it.
fn verify_transcript(transcript: &RaceTranscript) -> anyhow::Result<()> {
    info!("=== Verifying Determinism ===");

    let bytes = transcript.encode()?;
    info!(
        "Transcript size: {} bytes, fingerprint {}",
        bytes.len(),
        hex::encode(transcript.fingerprint())
    );
    let decoded = RaceTranscript::decode(&bytes)?;

    let expected = transcript.final_hash.context("transcript has no final hash")?;
    info!("Final State Hash: {}", hex::encode(expected));

    match verify(&decoded, &expected) {
        Ok(outcome) => {
            info!("Replay State Hash: {}", hex::encode(outcome.final_hash));
            info!("DETERMINISM VERIFIED: Hashes match!");
            Ok(())
        }
        Err(err) => {
            warn!("DETERMINISM FAILURE: {}", err);
            Err(err.into())
        }
    }
}
