//! # Tap Race
//!
//! Headless simulation core for a short foot race: the player taps to build
//! speed, AI runners keep their own pace, and checkpoints stop the player
//! for a quiz whose answer decides how fast they restart.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TAP RACE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── rng.rs       - Seeded Xorshift128+ (rand::RngCore)      │
//! │  └── hash.rs      - State hashing for race digests           │
//! │                                                              │
//! │  game/            - Race simulation                          │
//! │  ├── config.rs    - Configuration and validation             │
//! │  ├── track.rs     - Start, finish, checkpoint geometry       │
//! │  ├── state.rs     - Race and racer state                     │
//! │  ├── physics.rs   - Tap velocity, friction, integration      │
//! │  ├── checkpoint.rs- Quiz gates                               │
//! │  ├── competitor.rs- AI roster and pace drift                 │
//! │  ├── results.rs   - Finish positions and standings           │
//! │  ├── events.rs    - Host inputs and notifications            │
//! │  └── race.rs      - State machine and step loop              │
//! │                                                              │
//! │  surface/         - Host boundary                            │
//! │  ├── bus.rs       - Broadcast event channel                  │
//! │  └── host.rs      - Quiz / sound cue driver                  │
//! │                                                              │
//! │  replay/          - Input recording and replay checks        │
//! │  └── transcript.rs                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! A race built with [`Race::with_seed`] draws all of its randomness from a
//! [`DeterministicRng`]. Given the same configuration, seed, inputs and step
//! deltas it reaches a bit-identical state, which [`Race::compute_hash`]
//! digests and [`replay::verify`] checks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod replay;
pub mod surface;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::{
    AnswerOutcome, ConfigError, HostInput, Race, RaceConfig, RaceEvent, RacePhase, RaceResult,
    StepResult,
};
pub use replay::{RaceTranscript, ReplayError};
pub use surface::{EventBus, RaceHost};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Length of the frame friction is specified against (seconds).
pub const NOMINAL_FRAME_SECONDS: f64 = 1.0 / 60.0;
