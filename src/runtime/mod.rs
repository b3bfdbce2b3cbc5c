//! # Runtime Module
//!
//! Process-level pieces of the operator: start-up, the controller watch loop, and the retry
//! policy applied to failed passes.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
