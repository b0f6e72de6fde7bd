//! Diesel schema for item persistence.

diesel::table! {
    /// Ordered, versioned items scoped by tenant.
    items (id) {
        /// Item identifier.
        id -> Uuid,
        /// Tenant isolation key.
        tenant_id -> Uuid,
        /// Owning container.
        container_id -> Uuid,
        /// Sort position among non-deleted siblings.
        position -> Int8,
        /// Optimistic-concurrency counter.
        version -> Int8,
        /// Caller-owned payload.
        fields -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}
