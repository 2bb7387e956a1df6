//! Error taxonomy for the inode data engine.

use thiserror::Error;

/// Everything a caller of the engine can observe going wrong.
///
/// `NOT_IMPLEMENTED` from the original taxonomy has no variant here: every
/// operation the engine exposes is fully implemented, so constructing it
/// would be a bug rather than a reachable outcome.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An offset or size argument violated a precondition of the call
    /// (e.g. `modify` past `file_size`, or `shrink` to a larger size).
    #[error("invalid input")]
    InvalidInput,

    /// The block pool could not satisfy the blocks an operation needed.
    /// The inode is left exactly as it was before the call.
    #[error("out of blocks")]
    OutOfBlocks,

    /// `locate` was asked to resolve an offset with `create_if_missing =
    /// false` and found an empty slot. Escaping this from a `read` of a
    /// range within `file_size` indicates a broken invariant;
    /// `read` logs and recovers rather than propagating it.
    #[error("block not present")]
    NotPresent,
}

pub type Result<T> = core::result::Result<T, Error>;
