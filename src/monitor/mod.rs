//! Change detection and polling orchestration.
//!
//! - `state`: last-observed snapshots, case-normalized
//! - `detector`: pure snapshot diffing and event combination
//! - `poller`: the fetch → detect → combine → enrich → filter → dispatch →
//!   commit cycle, plus its scheduler

mod detector;
mod poller;
mod state;

pub use detector::{ChangeEvent, ChangeKind, VodInfo, combine_changes, detect_changes};
pub use poller::{ChangeHandler, Poller, PollerHandle};
pub use state::{StateStore, StreamerState, canonical_login};
