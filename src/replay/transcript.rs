//! Race Transcript Recording
//!
//! Records the seed, configuration and every host input and step delta of a
//! race, so it can be re-run headless and checked against its final digest.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::hash::{StateHash, StateHasher};
use crate::game::config::{ConfigError, RaceConfig};
use crate::game::events::HostInput;
use crate::game::race::Race;
use crate::game::results::RaceResult;
use crate::game::state::RacePhase;

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Inputs applied before one step, then the step's delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    /// Host inputs received since the previous step, in arrival order.
    pub inputs: Vec<HostInput>,
    /// Seconds passed to `Race::step`. Zero marks trailing inputs with no step.
    pub delta_seconds: f64,
}

/// Everything needed to re-run a race deterministically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceTranscript {
    /// Version for forward compatibility.
    pub version: u8,
    /// Seed for the race's `DeterministicRng`.
    pub seed: u64,
    /// Race configuration.
    pub config: RaceConfig,
    /// Recorded steps in order.
    pub steps: Vec<RecordedStep>,
    /// Digest of the race state when recording stopped.
    pub final_hash: Option<StateHash>,
}

impl RaceTranscript {
    /// Empty transcript for a seeded race.
    pub fn new(seed: u64, config: RaceConfig) -> Self {
        Self {
            version: TRANSCRIPT_VERSION,
            seed,
            config,
            steps: Vec::new(),
            final_hash: None,
        }
    }

    /// Total simulated seconds covered.
    pub fn duration_seconds(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.delta_seconds)
            .filter(|dt| dt.is_finite() && *dt > 0.0)
            .sum()
    }

    /// Total number of recorded host inputs.
    pub fn input_count(&self) -> usize {
        self.steps.iter().map(|s| s.inputs.len()).sum()
    }

    /// Digest of the seed and recorded inputs, for logging and deduplication.
    ///
    /// Independent of the configuration and the final hash.
    pub fn fingerprint(&self) -> StateHash {
        let mut hasher = StateHasher::for_transcript();
        hasher.update_u8(self.version);
        hasher.update_u64(self.seed);
        hasher.update_u32(self.steps.len() as u32);

        for step in &self.steps {
            hasher.update_f64(step.delta_seconds);
            hasher.update_u32(step.inputs.len() as u32);
            for input in &step.inputs {
                match *input {
                    HostInput::Tap => hasher.update_u8(0),
                    HostInput::Restart => hasher.update_u8(1),
                    HostInput::AnswerSubmitted { correct, time_taken_ms } => {
                        hasher.update_u8(2);
                        hasher.update_bool(correct);
                        hasher.update_u64(time_taken_ms);
                    }
                }
            }
        }
        hasher.finalize()
    }

    /// Serialize to bytes using bincode.
    pub fn encode(&self) -> Result<Vec<u8>, ReplayError> {
        bincode::serialize(self).map_err(|e| ReplayError::Encode(e.to_string()))
    }

    /// Deserialize from bytes, rejecting unknown versions.
    pub fn decode(data: &[u8]) -> Result<Self, ReplayError> {
        let transcript: Self =
            bincode::deserialize(data).map_err(|e| ReplayError::Decode(e.to_string()))?;
        if transcript.version != TRANSCRIPT_VERSION {
            return Err(ReplayError::VersionMismatch {
                expected: TRANSCRIPT_VERSION,
                got: transcript.version,
            });
        }
        Ok(transcript)
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Accumulates inputs and steps as a race runs.
#[derive(Clone, Debug)]
pub struct Recorder {
    transcript: RaceTranscript,
    pending: Vec<HostInput>,
}

impl Recorder {
    /// Start recording a seeded race.
    pub fn new(seed: u64, config: RaceConfig) -> Self {
        Self {
            transcript: RaceTranscript::new(seed, config),
            pending: Vec::new(),
        }
    }

    /// Note an input; it is attached to the next step.
    pub fn record_input(&mut self, input: HostInput) {
        self.pending.push(input);
    }

    /// Close the current step.
    pub fn record_step(&mut self, delta_seconds: f64) {
        self.transcript.steps.push(RecordedStep {
            inputs: std::mem::take(&mut self.pending),
            delta_seconds,
        });
    }

    /// Number of steps recorded so far.
    pub fn step_count(&self) -> usize {
        self.transcript.steps.len()
    }

    /// Stop recording and stamp the final digest.
    pub fn finish(mut self, final_hash: StateHash) -> RaceTranscript {
        if !self.pending.is_empty() {
            self.record_step(0.0);
        }
        self.transcript.final_hash = Some(final_hash);
        self.transcript
    }
}

// =============================================================================
// REPLAY
// =============================================================================

/// State reached by re-running a transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayOutcome {
    /// Digest of the replayed race.
    pub final_hash: StateHash,
    /// Phase the replayed race ended in.
    pub phase: RacePhase,
    /// Standings at the end of the replay.
    pub results: Vec<RaceResult>,
}

/// Re-run a transcript headless.
pub fn replay(transcript: &RaceTranscript) -> Result<ReplayOutcome, ReplayError> {
    let mut race = Race::with_seed(transcript.config.clone(), transcript.seed)?;

    for step in &transcript.steps {
        for input in &step.inputs {
            race.handle_input(*input);
        }
        race.step(step.delta_seconds);
    }

    Ok(ReplayOutcome {
        final_hash: race.compute_hash(),
        phase: race.phase(),
        results: race.teardown(),
    })
}

/// Re-run a transcript and check it lands on `expected`.
pub fn verify(transcript: &RaceTranscript, expected: &StateHash) -> Result<ReplayOutcome, ReplayError> {
    let outcome = replay(transcript)?;

    if &outcome.final_hash != expected {
        warn!(
            expected = %hex::encode(expected),
            computed = %hex::encode(outcome.final_hash),
            "replay diverged"
        );
        return Err(ReplayError::HashMismatch {
            expected: *expected,
            computed: outcome.final_hash,
        });
    }

    info!(
        steps = transcript.steps.len(),
        hash = %hex::encode(outcome.final_hash),
        "replay verified"
    );
    Ok(outcome)
}

/// Verify a transcript against the digest it was stamped with.
pub fn verify_recorded(transcript: &RaceTranscript) -> Result<ReplayOutcome, ReplayError> {
    let expected = transcript.final_hash.ok_or(ReplayError::Incomplete)?;
    verify(transcript, &expected)
}

/// Errors from encoding, decoding or replaying transcripts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    /// Transcript could not be serialized.
    #[error("transcript encoding failed: {0}")]
    Encode(String),

    /// Bytes are not a valid transcript.
    #[error("transcript decoding failed: {0}")]
    Decode(String),

    /// Transcript written by an incompatible version.
    #[error("transcript version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Version this build reads.
        expected: u8,
        /// Version found in the data.
        got: u8,
    },

    /// Recorded configuration no longer validates.
    #[error("invalid recorded configuration: {0}")]
    Config(#[from] ConfigError),

    /// Transcript has no final digest to check against.
    #[error("transcript has no final hash")]
    Incomplete,

    /// Replay ended in a different state.
    #[error("replay hash mismatch: expected {}, computed {}", hex::encode(expected), hex::encode(computed))]
    HashMismatch {
        /// Digest the caller expected.
        expected: StateHash,
        /// Digest the replay produced.
        computed: StateHash,
    },
}
