//! Use-case services over the ledger and repositories.
//!
//! # Responsibility
//! - `assignment_service`: the only path that changes allocations.
//! - `roster_service` / `project_service`: engineer and project lifecycle.
//! - `dashboard_service`: read-side capacity and timeline views.
//!
//! Services receive engineer/project identifiers and `now` explicitly per
//! call; none of them read ambient state.

pub mod assignment_service;
pub mod dashboard_service;
pub mod project_service;
pub mod roster_service;
