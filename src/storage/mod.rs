//! External collaborators: exported-file storage and per-user project documents.
//!
//! Both are traits so the HTTP layer only sees the operations it needs. The
//! bundled implementations keep everything local to the process host.

mod object;
mod project;

pub use object::{LocalObjectStore, ObjectStore};
pub use project::{MemoryProjectStore, ProjectStore};
