//! Host Boundary
//!
//! How a front end talks to a race: the broadcast event bus and a host
//! driver that wires in quiz and sound collaborators.

pub mod bus;
pub mod host;

pub use bus::EventBus;
pub use host::{Cue, CueSink, MathProblem, PendingQuiz, QuizProvider, RaceHost, SilentCues};
