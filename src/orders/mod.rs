//! Orders: pickup codes, placement with stock deduction, status changes.

pub mod code;
pub mod models;
pub mod notify;
pub mod qr;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod services;

pub use code::{allocate_code, normalize_code, CodePolicy, OrderCodeError};
pub use models::{OrderItem, OrderRow, OrderStatus};
pub use notify::Notifier;
pub use services::{lookup_by_code, place_order, update_status, PlaceOrderError};
