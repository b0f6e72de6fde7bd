//! Orchestration services for the ordering core.

mod coordinator;

pub use coordinator::{
    CreateItemRequest, DeleteItemRequest, MoveItemRequest, OrderingError, OrderingResult,
    OrderingService, ReorderItemRequest, UpdateItemRequest,
};
