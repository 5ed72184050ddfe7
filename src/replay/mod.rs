//! Replay Verification
//!
//! Record a seeded race's inputs and re-run them headless to confirm the
//! same final state digest.

pub mod transcript;

pub use transcript::{
    replay, verify, verify_recorded, RaceTranscript, RecordedStep, Recorder, ReplayError,
    ReplayOutcome, TRANSCRIPT_VERSION,
};
