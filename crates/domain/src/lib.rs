//! Travel order domain rules.
//!
//! This crate provides:
//! - [`StatusTransitionService`] moving orders between statuses with an
//!   optimistic concurrency check
//! - [`TravelOrderPolicy`] answering who may view and approve orders
//! - payload validation for creating orders and requesting status changes
//! - [`ListingRequest`] parsing and role-scoped listing queries

pub mod error;
pub mod listing;
pub mod policy;
pub mod transition;
pub mod validation;

pub use error::{DomainError, ValidationErrors};
pub use listing::{ListingRequest, parse_show_query, scoped_query};
pub use policy::{Caller, TravelOrderPolicy};
pub use transition::StatusTransitionService;
pub use validation::{validate_new_order, validate_status_change};
