//! Tessera: ordering and optimistic-concurrency core for agent-facing
//! Kanban backends.
//!
//! This crate owns the position and version mechanics of ordered, versioned,
//! tenant-scoped item collections: sparse-integer placement with midpoint
//! insertion and atomic rebalance, version-guarded writes, and the
//! coordinator that applies reorders and cross-container moves as single
//! atomic transitions. Request validation, authentication, and transport
//! live in external collaborators.
//!
//! # Architecture
//!
//! Tessera follows hexagonal architecture principles:
//!
//! - **Domain**: Pure ordering and concurrency logic with no infrastructure
//!   dependencies
//! - **Ports**: Abstract trait interfaces for storage and audit collaborators
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mockable::DefaultClock;
//! use tessera::ordering::adapters::memory::InMemoryItemStore;
//! use tessera::ordering::domain::{ContainerId, TenantId};
//! use tessera::ordering::ports::NullAuditSink;
//! use tessera::ordering::services::{CreateItemRequest, OrderingService};
//!
//! # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
//! let service = OrderingService::new(
//!     Arc::new(InMemoryItemStore::new()),
//!     Arc::new(NullAuditSink),
//!     Arc::new(DefaultClock),
//! );
//!
//! let tenant_id = TenantId::new();
//! let container_id = ContainerId::new();
//! let item = service
//!     .create_item(CreateItemRequest::new(tenant_id, container_id))
//!     .await
//!     .expect("item creation should succeed");
//! assert_eq!(item.position(), 1024);
//! # });
//! ```

pub mod ordering;
