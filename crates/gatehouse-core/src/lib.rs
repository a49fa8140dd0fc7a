//! Core types for the Gatehouse RBAC graph: entity models, the error
//! taxonomy and the repository traits every storage backend implements.

pub mod error;
pub mod models;
pub mod repository;

#[cfg(feature = "memory")]
pub mod memory;

pub use error::{ErrorKind, RbacError, RbacResult};
