//! Pure data types for lofs: backend tags, open modes, errors, directory entries.
//!
//! This crate is a leaf dependency with no I/O. Backend implementations and
//! callers can share the facade's vocabulary without pulling in the router.

pub mod backend;
pub mod dir_entry;
pub mod error;
pub mod mode;
pub mod space;

// Flat re-exports for convenience
pub use backend::*;
pub use dir_entry::*;
pub use error::*;
pub use mode::*;
pub use space::*;
