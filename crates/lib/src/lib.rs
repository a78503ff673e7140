//! Zameen assistant chat core: session store, readiness monitor, send dispatch and reply
//! reconciliation, plus the config, storage and HTTP client they run on.

pub mod assistant;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod init;
pub mod readiness;
pub mod reconcile;
pub mod session;
pub mod storage;

pub use controller::{ChatController, ControllerOptions, Dispatch, PendingReply, Rejection};
pub use readiness::Readiness;
pub use reconcile::ReplyOutcome;
pub use session::{Message, Origin};
