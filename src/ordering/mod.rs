//! Ordering and concurrency core for tenant-scoped item collections.
//!
//! Items (cards within a column, columns within a board) carry sparse
//! integer positions and a monotonically incrementing version. This module
//! owns the placement computation, the optimistic-concurrency guard, and the
//! coordinator that commits each mutation as one atomic store write. The
//! module follows hexagonal architecture:
//!
//! - Domain types and position planning in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
