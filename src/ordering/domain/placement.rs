//! Position planning for ordered siblings.
//!
//! Siblings carry sparse integer positions spaced [`DEFAULT_GAP`] apart, so
//! most insertions compute a midpoint between two neighbours and touch no
//! other row. Only when a midpoint no longer exists (adjacent positions
//! differing by less than 2) does the planner fall back to renumbering the
//! whole sibling set in one atomic batch. A computed position that would tie
//! with an existing one is never used; the rebalance path is taken instead.

use super::error::{InvalidTargetReason, PlacementError};
use super::ids::ItemId;
use serde::{Deserialize, Serialize};

/// Spacing between consecutive sibling positions on append and rebalance.
pub const DEFAULT_GAP: i64 = 1024;

/// Lower bound for sibling positions; `Start` placements floor here.
pub const MIN_POSITION: i64 = 0;

/// First position assigned by a rebalance.
pub const REBALANCE_BASE: i64 = MIN_POSITION;

/// Smallest adjacent difference that still admits an integer midpoint.
const MIN_ADJACENT_GAP: i64 = 2;

/// Where to place an item relative to its future siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementTarget {
    /// Append after the last sibling.
    End,
    /// Insert before the first sibling.
    Start,
    /// Insert between the anchor and its immediate successor.
    After {
        /// Sibling the item is placed after.
        anchor: ItemId,
    },
    /// Insert between the anchor and its immediate predecessor.
    Before {
        /// Sibling the item is placed before.
        anchor: ItemId,
    },
    /// Take an exact position value.
    Absolute {
        /// Requested position.
        position: i64,
        /// Whether an occupying sibling may be displaced via rebalance.
        #[serde(default)]
        displace: bool,
    },
}

/// One sibling of the container under placement, as read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingEntry {
    /// Sibling item identifier.
    pub id: ItemId,
    /// Stored position of the sibling.
    pub position: i64,
}

/// Ordered view of a container's non-deleted siblings.
///
/// This is a derived view recomputed from stored `(container_id, position)`
/// pairs on each request; it is never cached across operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiblingSnapshot {
    entries: Vec<SiblingEntry>,
}

impl SiblingSnapshot {
    /// Creates a snapshot, ordering the entries by position.
    #[must_use]
    pub fn new(mut entries: Vec<SiblingEntry>) -> Self {
        entries.sort_by_key(|entry| entry.position);
        Self { entries }
    }

    /// Creates a snapshot of an empty container.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the entries in position order.
    #[must_use]
    pub fn entries(&self) -> &[SiblingEntry] {
        &self.entries
    }

    /// Returns the number of siblings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the container has no non-deleted siblings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the position-order index of the given sibling.
    #[must_use]
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Returns `true` when the given item is part of the snapshot.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.index_of(id).is_some()
    }

    /// Returns a copy of the snapshot with the given item removed.
    ///
    /// Used when an item is re-placed within its own container: the item
    /// cannot anchor or collide with itself.
    #[must_use]
    pub fn without(&self, id: ItemId) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .copied()
                .filter(|entry| entry.id != id)
                .collect(),
        }
    }

    fn first(&self) -> Option<&SiblingEntry> {
        self.entries.first()
    }

    fn last(&self) -> Option<&SiblingEntry> {
        self.entries.last()
    }
}

/// New position for an existing sibling within a rebalance batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAssignment {
    /// Sibling being renumbered.
    pub id: ItemId,
    /// Position assigned to the sibling.
    pub position: i64,
}

/// Outcome of planning a placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementPlan {
    /// The item takes `position`; no sibling is written.
    Direct {
        /// Position for the placed item.
        position: i64,
    },
    /// The whole sibling set is renumbered in one atomic batch.
    Rebalance {
        /// Position for the placed item within the renumbered set.
        position: i64,
        /// New positions for every pre-existing sibling, in relative order.
        reassignments: Vec<PositionAssignment>,
    },
}

impl PlacementPlan {
    /// Returns the position assigned to the placed item.
    #[must_use]
    pub const fn position(&self) -> i64 {
        match *self {
            Self::Direct { position } | Self::Rebalance { position, .. } => position,
        }
    }

    /// Returns the sibling reassignments required by the plan.
    #[must_use]
    pub fn reassignments(&self) -> &[PositionAssignment] {
        match self {
            Self::Direct { .. } => &[],
            Self::Rebalance { reassignments, .. } => reassignments,
        }
    }

    /// Returns `true` when the plan renumbers the sibling set.
    #[must_use]
    pub const fn is_rebalance(&self) -> bool {
        matches!(self, Self::Rebalance { .. })
    }
}

/// Plans a position for an item entering the given sibling set.
///
/// The snapshot must not contain the item being placed; callers re-placing
/// an item within its own container strip it first via
/// [`SiblingSnapshot::without`].
///
/// # Errors
///
/// Returns [`PlacementError::Target`] when an anchor is not a sibling or an
/// absolute position is negative, and [`PlacementError::PositionOccupied`]
/// when an absolute position collides without displacement requested.
pub fn plan_placement(
    siblings: &SiblingSnapshot,
    target: &PlacementTarget,
) -> Result<PlacementPlan, PlacementError> {
    match *target {
        PlacementTarget::End => Ok(PlacementPlan::Direct {
            position: append_position(siblings),
        }),
        PlacementTarget::Start => Ok(prepend_plan(siblings)),
        PlacementTarget::After { anchor } => plan_after(siblings, anchor),
        PlacementTarget::Before { anchor } => plan_before(siblings, anchor),
        PlacementTarget::Absolute { position, displace } => {
            plan_absolute(siblings, position, displace)
        }
    }
}

fn append_position(siblings: &SiblingSnapshot) -> i64 {
    siblings
        .last()
        .map_or(DEFAULT_GAP, |last| last.position.saturating_add(DEFAULT_GAP))
}

fn prepend_plan(siblings: &SiblingSnapshot) -> PlacementPlan {
    siblings.first().map_or(
        PlacementPlan::Direct {
            position: DEFAULT_GAP,
        },
        |first| plan_before_first(siblings, first.position),
    )
}

/// Plans a slot below the current first position, floored at
/// [`MIN_POSITION`]; a floor collision renumbers with the item first.
fn plan_before_first(siblings: &SiblingSnapshot, first_position: i64) -> PlacementPlan {
    let candidate = first_position.saturating_sub(DEFAULT_GAP).max(MIN_POSITION);
    if candidate == first_position {
        rebalance(siblings, 0)
    } else {
        PlacementPlan::Direct {
            position: candidate,
        }
    }
}

fn plan_after(
    siblings: &SiblingSnapshot,
    anchor: ItemId,
) -> Result<PlacementPlan, PlacementError> {
    let index = siblings
        .index_of(anchor)
        .ok_or(InvalidTargetReason::UnknownAnchor(anchor))?;
    let anchor_position = siblings
        .entries()
        .get(index)
        .map_or(MIN_POSITION, |entry| entry.position);

    let plan = siblings.entries().get(index.saturating_add(1)).map_or(
        PlacementPlan::Direct {
            position: anchor_position.saturating_add(DEFAULT_GAP),
        },
        |successor| {
            plan_between(
                siblings,
                anchor_position,
                successor.position,
                index.saturating_add(1),
            )
        },
    );
    Ok(plan)
}

fn plan_before(
    siblings: &SiblingSnapshot,
    anchor: ItemId,
) -> Result<PlacementPlan, PlacementError> {
    let index = siblings
        .index_of(anchor)
        .ok_or(InvalidTargetReason::UnknownAnchor(anchor))?;
    let anchor_position = siblings
        .entries()
        .get(index)
        .map_or(MIN_POSITION, |entry| entry.position);

    let plan = index.checked_sub(1).map_or_else(
        || plan_before_first(siblings, anchor_position),
        |predecessor_index| {
            let predecessor_position = siblings
                .entries()
                .get(predecessor_index)
                .map_or(MIN_POSITION, |entry| entry.position);
            plan_between(siblings, predecessor_position, anchor_position, index)
        },
    );
    Ok(plan)
}

/// Plans the midpoint between two adjacent positions, renumbering when the
/// gap no longer admits one.
fn plan_between(
    siblings: &SiblingSnapshot,
    lower: i64,
    upper: i64,
    insert_index: usize,
) -> PlacementPlan {
    if upper.saturating_sub(lower) < MIN_ADJACENT_GAP {
        rebalance(siblings, insert_index)
    } else {
        PlacementPlan::Direct {
            position: lower.midpoint(upper),
        }
    }
}

fn plan_absolute(
    siblings: &SiblingSnapshot,
    position: i64,
    displace: bool,
) -> Result<PlacementPlan, PlacementError> {
    if position < MIN_POSITION {
        return Err(InvalidTargetReason::NegativePosition(position).into());
    }

    let Some(occupied_index) = siblings
        .entries()
        .iter()
        .position(|entry| entry.position == position)
    else {
        return Ok(PlacementPlan::Direct { position });
    };

    if displace {
        Ok(rebalance(siblings, occupied_index))
    } else {
        Err(PlacementError::PositionOccupied(position))
    }
}

/// Renumbers the sibling set at [`DEFAULT_GAP`] intervals with the placed
/// item at `insert_index`, preserving the prior relative order.
fn rebalance(siblings: &SiblingSnapshot, insert_index: usize) -> PlacementPlan {
    let mut reassignments = Vec::with_capacity(siblings.len());
    let mut next_slot = REBALANCE_BASE;
    let mut placed = REBALANCE_BASE;

    for (index, entry) in siblings.entries().iter().enumerate() {
        if index == insert_index {
            placed = next_slot;
            next_slot = next_slot.saturating_add(DEFAULT_GAP);
        }
        reassignments.push(PositionAssignment {
            id: entry.id,
            position: next_slot,
        });
        next_slot = next_slot.saturating_add(DEFAULT_GAP);
    }
    if insert_index >= siblings.len() {
        placed = next_slot;
    }

    PlacementPlan::Rebalance {
        position: placed,
        reassignments,
    }
}
