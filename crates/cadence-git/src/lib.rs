//! Cadence Git - Git-backed repository access
//!
//! This crate reads task configuration out of local git checkouts at
//! arbitrary revisions.

mod access;
mod repository;

pub use access::GitRepoAccess;
pub use repository::{GitRepo, Result};
