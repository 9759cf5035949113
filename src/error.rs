use crate::features::InstructionSet;

/// Errors surfaced by the SMix core.
///
/// Argument validation happens before any allocation, and buffers are
/// only mutated after every allocation has succeeded, so an `Err`
/// always leaves the caller's data untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A size or count constraint was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An aligned buffer allocation failed.
    #[error("aligned allocation of {size} bytes failed")]
    AllocationFailure {
        /// The requested allocation size in bytes.
        size: usize,
    },
    /// No kernel is registered for the given instruction set.
    #[error("no SMix kernel available for instruction set {0:?}")]
    UnsupportedInstructionSet(InstructionSet),
}
