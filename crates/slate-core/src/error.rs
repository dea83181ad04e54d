//! Validation failures.
//!
//! Every rejected operation in the engine degrades to a no-op plus one of
//! these values. Nothing here is a panic path: callers may ignore the
//! rejection entirely or surface it as UI feedback.

use std::fmt;

/// Why a requested mutation was refused. State is left unchanged in every
/// case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An element id referenced by the request is not in the graph.
    UnknownElement,
    /// A connection request with identical source and target.
    SelfLoop,
    /// A connection between this source/target pair already exists
    /// (or is already buffered awaiting flush).
    DuplicateConnection,
    /// The element's owning layer is locked.
    LockedLayer,
    /// The target layer does not exist.
    NoSuchLayer,
    /// A resize below the minimum element size.
    BelowMinSize,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Rejection::UnknownElement => "element not present in the graph",
            Rejection::SelfLoop => "connection source and target are the same element",
            Rejection::DuplicateConnection => "connection between this pair already exists",
            Rejection::LockedLayer => "element's layer is locked",
            Rejection::NoSuchLayer => "target layer does not exist",
            Rejection::BelowMinSize => "size below the minimum element size",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Rejection {}
