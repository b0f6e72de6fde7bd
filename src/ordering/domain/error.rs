//! Error types for ordering domain validation and placement.

use super::ids::ItemId;
use thiserror::Error;

/// Error returned while parsing version counters from persistence.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid version {0}, expected a counter of at least 1")]
pub struct ParseVersionError(pub i64);

/// Reasons a placement target is unusable against a sibling set.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvalidTargetReason {
    /// The anchor item does not exist among the container's non-deleted
    /// siblings (unknown id, wrong container, or wrong tenant).
    #[error("anchor item {0} is not a sibling in the target container")]
    UnknownAnchor(ItemId),

    /// An absolute position below the minimum was requested.
    #[error("absolute position {0} is below the minimum of 0")]
    NegativePosition(i64),
}

/// Errors produced by the position planner.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// The placement target cannot be resolved.
    #[error(transparent)]
    Target(#[from] InvalidTargetReason),

    /// The requested absolute position is held by another sibling and
    /// displacement was not requested.
    #[error("position {0} is already occupied")]
    PositionOccupied(i64),
}
