//! Timeline sweep loop.
//!
//! Repeatedly scans the owner's timeline, hands the first unprocessed item to the
//! UI driver, retires it from view and advances the viewport, until a budget runs out.
//!
//! ```text
//! detect owner (fatal on failure)
//! while budgets remain:
//!     candidates = view.list_candidates(owner)   // Scanning
//!     outcome    = driver.attempt_delete(first)  // Processing
//!     remover.retire(first)
//!     advancer.advance_one_page()                // Advancing
//! ```

pub mod config;
pub mod controller;
pub mod errors;
pub mod metrics;
pub mod state;

pub use config::SweepConfig;
pub use controller::{SweepController, SweepSummary};
pub use errors::SweepError;
pub use state::{LoopPhase, RunState, TerminationReason};
