use async_trait::async_trait;

use crate::{
    NewTravelOrder, OrderPage, OrderQuery, Result, TravelOrder, TravelOrderId, TravelOrderStatus,
    User, UserId,
};

/// Core trait for travel order storage.
///
/// All implementations must be thread-safe (Send + Sync). Soft-deleted orders
/// are invisible to every read and to the conditional status update.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order with status `requested` and returns the stored record.
    async fn insert(&self, order: NewTravelOrder) -> Result<TravelOrder>;

    /// Loads an order by id.
    ///
    /// Returns None if the order doesn't exist or was soft-deleted.
    async fn find(&self, id: TravelOrderId) -> Result<Option<TravelOrder>>;

    /// Atomically sets the status to `to` only if the stored status is still `expected`.
    ///
    /// Returns the number of rows affected: 1 on success, 0 if the status had
    /// already moved (or the order is gone). This is the only way order status
    /// is ever written.
    async fn update_status_if(
        &self,
        id: TravelOrderId,
        expected: TravelOrderStatus,
        to: TravelOrderStatus,
    ) -> Result<u64>;

    /// Returns one page of orders matching the query.
    async fn list(&self, query: &OrderQuery) -> Result<OrderPage>;

    /// Marks an order as deleted. Returns false if it was absent or already deleted.
    async fn soft_delete(&self, id: TravelOrderId) -> Result<bool>;
}

/// Read access to user accounts owned by the authentication service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Loads a user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Inserts or replaces a user record (seeding and tests).
    async fn upsert_user(&self, user: User) -> Result<()>;
}
