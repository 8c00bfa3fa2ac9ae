//! Domain records consumed by the allocation engine.
//!
//! # Responsibility
//! - Define engineers, projects and assignments with their field invariants.
//! - Keep validation next to the record it protects.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Assignments are hard-deleted on unassign; there are no tombstones.

pub mod assignment;
pub mod engineer;
pub mod project;
pub mod validation;
