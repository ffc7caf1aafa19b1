//! Domain layer: pure bridge rules with no OS or network dependencies.
//!
//! Everything in here is deterministic given its inputs, which is what lets
//! the orchestrator in the `wsbridge` crate stay a thin shell around these
//! types.

pub mod notification;
pub mod signals;
pub mod status;
pub mod traffic;
pub mod transition;
