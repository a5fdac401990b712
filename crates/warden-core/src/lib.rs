//! # warden-core
//!
//! Core crate for Warden. Contains the collaborator traits the trust
//! engine consumes (stores, capability control, platform detection,
//! clock), configuration schemas, and the unified error system.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
