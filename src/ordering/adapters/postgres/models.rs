//! Diesel row models for item persistence.

use super::schema::items;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for item records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemRow {
    /// Item identifier.
    pub id: uuid::Uuid,
    /// Tenant isolation key.
    pub tenant_id: uuid::Uuid,
    /// Owning container.
    pub container_id: uuid::Uuid,
    /// Sort position.
    pub position: i64,
    /// Optimistic-concurrency counter.
    pub version: i64,
    /// Caller-owned JSON payload.
    pub fields: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insert model for item records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = items)]
pub struct NewItemRow {
    /// Item identifier.
    pub id: uuid::Uuid,
    /// Tenant isolation key.
    pub tenant_id: uuid::Uuid,
    /// Owning container.
    pub container_id: uuid::Uuid,
    /// Sort position.
    pub position: i64,
    /// Optimistic-concurrency counter.
    pub version: i64,
    /// Caller-owned JSON payload.
    pub fields: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}
