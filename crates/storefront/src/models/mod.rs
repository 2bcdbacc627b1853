//! Domain models for the checkout flow.

pub mod address;
pub mod order;
pub mod session;

pub use address::{Address, AddressPatch, NewAddress};
pub use order::{AddressSnapshot, CustomerInfo, NewOrder, NewOrderItem, Order, OrderItem};
pub use session::{CurrentUser, session_keys};
