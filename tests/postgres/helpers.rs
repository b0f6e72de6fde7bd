//! Pool bootstrap and service wiring for the `PostgreSQL` suite.

use std::sync::Arc;

use diesel::PgConnection;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use once_cell::sync::OnceCell;
use tessera::ordering::{
    adapters::postgres::{ItemPgPool, PostgresItemStore},
    ports::NullAuditSink,
    services::OrderingService,
};

/// Environment variable naming the database under test.
pub const DATABASE_URL_VAR: &str = "TESSERA_TEST_DATABASE_URL";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS items (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    container_id UUID NOT NULL,
    position BIGINT NOT NULL,
    version BIGINT NOT NULL,
    fields JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    deleted_at TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS idx_items_container_position
    ON items (tenant_id, container_id, position);
CREATE UNIQUE INDEX IF NOT EXISTS idx_items_container_position_unique
    ON items (tenant_id, container_id, position)
    WHERE deleted_at IS NULL;
";

static POOL: OnceCell<Option<ItemPgPool>> = OnceCell::new();

/// Returns the shared pool, or `None` when no database is configured.
///
/// The schema is applied on first use.
#[must_use]
pub fn test_pool() -> Option<ItemPgPool> {
    POOL.get_or_init(|| {
        let url = std::env::var(DATABASE_URL_VAR).ok()?;
        let pool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(url))
            .ok()?;
        let mut connection = pool.get().ok()?;
        connection.batch_execute(SCHEMA_SQL).ok()?;
        Some(pool)
    })
    .clone()
}

/// Service type under test.
pub type PgService = OrderingService<PostgresItemStore, NullAuditSink, DefaultClock>;

/// Builds a service over the shared pool.
#[must_use]
pub fn service(pool: ItemPgPool) -> PgService {
    OrderingService::new(
        Arc::new(PostgresItemStore::new(pool)),
        Arc::new(NullAuditSink),
        Arc::new(DefaultClock),
    )
}
