//! Authorization rules for travel orders.

use common::UserId;
use store::{TravelOrder, User};

use crate::DomainError;

/// The authenticated identity making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub is_admin: bool,
}

impl Caller {
    pub fn new(id: UserId, is_admin: bool) -> Self {
        Self { id, is_admin }
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.is_admin)
    }
}

/// Yes/no answers about what a caller may do with travel orders.
///
/// Callers must reject the whole operation on a `false` answer before touching
/// any data, see [`TravelOrderPolicy::authorize`].
pub struct TravelOrderPolicy;

impl TravelOrderPolicy {
    /// Any authenticated caller may request a listing; the listing itself is scoped.
    pub fn view_any(_caller: &Caller) -> bool {
        true
    }

    /// Owners and administrators may view an order.
    pub fn view(caller: &Caller, order: &TravelOrder) -> bool {
        caller.is_admin || order.is_owned_by(caller.id)
    }

    /// Only administrators may change an order's status. Ownership is irrelevant.
    pub fn approve(caller: &Caller, _order: &TravelOrder) -> bool {
        caller.is_admin
    }

    /// Turns a gate answer into `Err(Forbidden)` when denied.
    pub fn authorize(allowed: bool) -> Result<(), DomainError> {
        if allowed {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use store::NewTravelOrder;

    use super::*;

    fn order_owned_by(owner: UserId) -> TravelOrder {
        NewTravelOrder {
            user_id: owner,
            requester_name: "Ana".to_string(),
            destination: "Recife".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2030, 1, 12).unwrap(),
        }
        .into_order(Utc::now())
    }

    #[test]
    fn test_view_allows_owner_and_admin_only() {
        let owner = Caller::new(UserId::new(), false);
        let admin = Caller::new(UserId::new(), true);
        let stranger = Caller::new(UserId::new(), false);
        let order = order_owned_by(owner.id);

        assert!(TravelOrderPolicy::view(&owner, &order));
        assert!(TravelOrderPolicy::view(&admin, &order));
        assert!(!TravelOrderPolicy::view(&stranger, &order));
    }

    #[test]
    fn test_approve_is_admin_only() {
        let owner = Caller::new(UserId::new(), false);
        let admin = Caller::new(UserId::new(), true);
        let order = order_owned_by(owner.id);

        assert!(!TravelOrderPolicy::approve(&owner, &order));
        assert!(TravelOrderPolicy::approve(&admin, &order));

        let own_order_admin = Caller::new(owner.id, true);
        assert!(TravelOrderPolicy::approve(&own_order_admin, &order));
    }

    #[test]
    fn test_view_any_always_passes() {
        assert!(TravelOrderPolicy::view_any(&Caller::new(UserId::new(), false)));
        assert!(TravelOrderPolicy::view_any(&Caller::new(UserId::new(), true)));
    }

    #[test]
    fn test_authorize_maps_denial_to_forbidden() {
        assert!(TravelOrderPolicy::authorize(true).is_ok());
        assert!(matches!(
            TravelOrderPolicy::authorize(false),
            Err(DomainError::Forbidden)
        ));
    }

    #[test]
    fn test_caller_from_user() {
        let admin = User::admin("Root", "root@example.com");
        let caller = Caller::from(&admin);
        assert_eq!(caller.id, admin.id);
        assert!(caller.is_admin);
    }
}
