use chrono::{DateTime, NaiveDate, Utc};
use common::{TravelOrderId, TravelOrderStatus, UserId};

/// A persisted travel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelOrder {
    pub id: TravelOrderId,
    /// The owning user.
    pub user_id: UserId,
    pub requester_name: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: TravelOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted orders stay in storage but are never returned.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TravelOrder {
    /// Returns true if `user_id` owns this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The validated fields of an order about to be created.
///
/// The store assigns the id, the initial `requested` status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTravelOrder {
    pub user_id: UserId,
    pub requester_name: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
}

impl NewTravelOrder {
    /// Materializes the record the store persists for this submission.
    pub fn into_order(self, now: DateTime<Utc>) -> TravelOrder {
        TravelOrder {
            id: TravelOrderId::new(),
            user_id: self.user_id,
            requester_name: self.requester_name,
            destination: self.destination,
            departure_date: self.departure_date,
            return_date: self.return_date,
            status: TravelOrderStatus::Requested,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// A user as seen by the travel order service.
///
/// Accounts are managed by the authentication service; this crate only reads
/// them (and inserts them for seeding and tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    /// Creates an administrator account.
    pub fn admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(name, email)
        }
    }
}
