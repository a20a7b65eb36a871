//! Shared identifiers and the travel order status machine.

pub mod locale;
pub mod status;
pub mod types;

pub use locale::Locale;
pub use status::{ParseStatusError, TravelOrderStatus};
pub use types::{TravelOrderId, UserId};
