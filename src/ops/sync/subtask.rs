//! The unit of work the sync coordinator sequences.

use anyhow::Result;

/// One step of the sync pipeline.
///
/// Subtasks carry their own input, decided before the pipeline starts;
/// an absent input means "skip".
pub trait Subtask {
    /// Short name used in log prefixes and error context.
    fn name(&self) -> &'static str;

    fn run(&self) -> Result<()>;
}
