//! Database models shared across modules

mod point;

pub use point::{Coordinates, PickupPoint};
