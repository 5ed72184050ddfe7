//! Game Logic Module
//!
//! The race simulation. Seeded runs are fully reproducible.
//!
//! ## Module Structure
//!
//! - `config`: Race configuration and validation
//! - `track`: Track geometry (start, finish, checkpoints)
//! - `state`: Race state, racers, checkpoints
//! - `physics`: Controlled racer tap/friction integrator
//! - `checkpoint`: Checkpoint gate and quiz answer handling
//! - `competitor`: AI roster, pace and drift
//! - `results`: Finish positions and result views
//! - `events`: Host inputs and race notifications
//! - `race`: State machine and per-step orchestration

pub mod config;
pub mod track;
pub mod state;
pub mod physics;
pub mod checkpoint;
pub mod competitor;
pub mod results;
pub mod events;
pub mod race;

// Re-export key types
pub use checkpoint::AnswerOutcome;
pub use config::{CompetitorProfile, ConfigError, PhysicsTuning, RaceConfig};
pub use events::{HostInput, RaceEvent};
pub use race::{Race, StepResult};
pub use results::RaceResult;
pub use state::{RacePhase, RaceState, RacerState};
pub use track::TrackGeometry;
