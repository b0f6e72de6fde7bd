//! Domain model for ordered, versioned, tenant-scoped items.
//!
//! The domain owns the position planning rules and the optimistic-concurrency
//! version semantics while keeping every infrastructure concern outside the
//! boundary. Sibling order is always a derived view over stored positions,
//! never shared mutable state.

mod error;
mod ids;
mod item;
mod placement;
mod version;

pub use error::{InvalidTargetReason, ParseVersionError, PlacementError};
pub use ids::{ContainerId, ItemId, TenantId};
pub use item::{FieldPatch, Item, PersistedItemData};
pub use placement::{
    DEFAULT_GAP, MIN_POSITION, PlacementPlan, PlacementTarget, PositionAssignment, REBALANCE_BASE,
    SiblingEntry, SiblingSnapshot, plan_placement,
};
pub use version::{Version, VersionGuard, VersionMismatch};
