//! UI action driver
//!
//! Walks one timeline item through the platform's delete flow
//! (menu, delete item, confirmation) and reports a [`DeleteOutcome`].
//! The driver never persists anything; retiring the item is the caller's job.

pub mod errors;
pub mod executor;
pub mod types;

pub use errors::DriverError;
pub use executor::{DeleteExecutor, UiActionDriver};
pub use types::{DeleteOutcome, DeleteStep};
