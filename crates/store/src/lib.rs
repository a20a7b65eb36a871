//! Travel order persistence.
//!
//! Provides the [`OrderStore`] and [`UserDirectory`] traits together with an
//! in-memory implementation (tests, demo mode) and a PostgreSQL one.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{TravelOrderId, TravelOrderStatus, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{
    DEFAULT_PER_PAGE, MAX_PER_PAGE, OrderFilters, OrderPage, OrderQuery, SortDirection, SortField,
    SortKey,
};
pub use record::{NewTravelOrder, TravelOrder, User};
pub use store::{OrderStore, UserDirectory};
