//! # Reconciler
//!
//! Converges the children of a Cars object in a fixed order and reports the outcome on its
//! status.
//!
//! ## Sub-modules
//!
//! - `batch` - ordered, short-circuiting step runner
//! - `converge` - one converger per child resource
//! - `ownership` - discriminator label and controller owner reference
//! - `status` - `Reconciled` condition bookkeeping
//! - `reconcile` - pass entry points
//! - `types` - context and error types

pub mod batch;
pub mod converge;
pub mod ownership;
pub mod reconcile;
pub mod status;
pub mod types;

pub use batch::{run_batch, BatchOutcome, Converger, StepOutcome};
pub use converge::default_convergers;
pub use reconcile::{reconcile, reconcile_pass};
pub use status::{reconciled_condition, report_outcome, set_status_condition};
pub use types::{Context, ReconcilerError};
