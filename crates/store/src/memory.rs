use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    NewTravelOrder, OrderPage, OrderQuery, Result, TravelOrder, TravelOrderId, TravelOrderStatus,
    User, UserId,
    store::{OrderStore, UserDirectory},
};

/// In-memory store implementation for tests and demo mode.
///
/// This implementation keeps all orders and users in memory and provides
/// the same interface as the PostgreSQL implementation. The conditional
/// status update runs under a single write lock, which makes it a true
/// compare-and-swap.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<TravelOrderId, TravelOrder>>>,
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored, including soft-deleted ones.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Loads an order by id, including soft-deleted ones.
    pub async fn find_including_deleted(&self, id: TravelOrderId) -> Option<TravelOrder> {
        self.orders.read().await.get(&id).cloned()
    }

    /// Overrides the creation timestamp of an order (fixtures and seeding).
    pub async fn backdate(&self, id: TravelOrderId, created_at: DateTime<Utc>) -> bool {
        match self.orders.write().await.get_mut(&id) {
            Some(order) => {
                order.created_at = created_at;
                order.updated_at = created_at;
                true
            }
            None => false,
        }
    }

    /// Clears all orders and users.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
        self.users.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert(&self, order: NewTravelOrder) -> Result<TravelOrder> {
        let order = order.into_order(Utc::now());
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find(&self, id: TravelOrderId) -> Result<Option<TravelOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).filter(|o| !o.is_deleted()).cloned())
    }

    async fn update_status_if(
        &self,
        id: TravelOrderId,
        expected: TravelOrderStatus,
        to: TravelOrderStatus,
    ) -> Result<u64> {
        let mut orders = self.orders.write().await;

        match orders.get_mut(&id) {
            Some(order) if !order.is_deleted() && order.status == expected => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list(&self, query: &OrderQuery) -> Result<OrderPage> {
        let orders = self.orders.read().await;
        let mut matching: Vec<_> = orders.values().filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.per_page() as usize)
            .cloned()
            .collect();

        Ok(OrderPage {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        })
    }

    async fn soft_delete(&self, id: TravelOrderId) -> Result<bool> {
        let mut orders = self.orders.write().await;

        match orders.get_mut(&id) {
            Some(order) if !order.is_deleted() => {
                order.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn upsert_user(&self, user: User) -> Result<()> {
        self.users.write().await.insert(user.id, user);
        Ok(())
    }
}
