//! An in-memory, single-threaded inode data engine.
//!
//! This crate is the storage core of a small UNIX-style filesystem: a block
//! pool, an inode addressing scheme built from a direct-block array plus a
//! chained indirect-index list, and the primitive operations
//! ([`ops::write_append`], [`ops::read`], [`ops::modify`], [`ops::shrink`],
//! [`ops::release`]) that move bytes in and out of an inode.
//!
//! What this crate is *not*: a file-handle layer (`open`/`close`/`seek`), a
//! directory tree, a path parser, or an on-disk image format. Those belong
//! one layer up, as callers of [`Filesystem`] and [`Inode`].
#![deny(rust_2018_idioms)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(missing_debug_implementations)]

pub mod error;
pub mod filesystem;
mod index_block;
pub mod inode;
pub mod ops;
pub mod param;
pub mod pool;

pub use error::{Error, Result};
pub use filesystem::Filesystem;
pub use inode::Inode;
pub use pool::BlockIndex;
