//! JobFit engine: scores an uploaded resume against a job description via a
//! remote capability platform and persists the outcome for later review.
//!
//! The core is a session state machine (`session`), a typed capability
//! gateway with swappable backends (`gateway`, `platform`), the analysis
//! workflow (`pipeline`), bulk data removal (`wipe`), and a record review
//! loader (`review`).

pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod review;
pub mod session;
pub mod wipe;

pub use errors::AppError;
pub use gateway::Gateway;
pub use session::{SessionPhase, SessionState, SessionStore};
