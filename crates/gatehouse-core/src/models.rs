//! Domain models for Gatehouse.
//!
//! Entities are keyed by id; the three many-to-many relations are stored
//! as independent [`edge::Edge`] rows so that authorization checks and
//! reporting read the same edge set.

pub mod action;
pub mod edge;
pub mod group;
pub mod module;
pub mod permission;
pub mod principal;
pub mod role;
pub mod user;
