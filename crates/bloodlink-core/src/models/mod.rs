//! Domain models for the bloodlink system.

mod appointment;
mod clinic;
mod donor;
mod notification;
mod request;

pub use appointment::*;
pub use clinic::*;
pub use donor::*;
pub use notification::*;
pub use request::*;
