//! Data types of the demo API.

pub mod fixtures;
pub mod user;

pub use user::*;
