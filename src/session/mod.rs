//! Session module
//!
//! Startup bootstrap of the catalog service client, the holder owning the
//! client and the single active session, and the shell lifecycle around them.

pub mod bootstrap;
pub mod holder;
pub mod lifecycle;

// Re-exports
pub use bootstrap::{connect, Bootstrap, RetryPolicy};
pub use holder::{
    create_shared_holder, CloseOutcome, HolderState, OpenOutcome, SessionHolder, SharedHolder,
};
pub use lifecycle::{run_until_shutdown, ShellExit};
