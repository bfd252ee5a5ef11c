//! Timeline primitives
//!
//! This crate holds everything the sweeper needs below the UI driver:
//! - the [`HostPage`] contract and its CDP-backed implementation
//! - view queries, the viewport advancer and the item remover
//! - tempo (settle pauses), the delete-label matcher and owner detection

pub mod advance;
pub mod cdp_host;
pub mod errors;
pub mod host;
pub mod intent;
pub mod owner;
pub mod remover;
pub mod tempo;
pub mod types;
pub mod view;
mod waiting;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use advance::{StepPolicy, ViewportAdvancer};
pub use cdp_host::{CdpHostPage, SiteProfile};
pub use errors::*;
pub use host::HostPage;
pub use intent::{DeleteIntent, DEFAULT_DELETE_LABELS};
pub use owner::{detect_owner, owner_from_href};
pub use remover::{nearest_container, ItemRemover, RetireReport, RetireStrategy};
pub use tempo::{Pacer, Pause, Tempo};
pub use types::*;
pub use view::TimelineView;
pub use waiting::*;
