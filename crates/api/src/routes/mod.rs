pub mod system;
pub mod travel_orders;
