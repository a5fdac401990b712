//! # warden-entity
//!
//! Domain entity models for the Warden second-factor engine: user
//! credentials, protected secret blobs, trusted devices, out-of-band
//! challenges and approval sessions, messenger links, and the subject
//! snapshot handed to the engine by the host environment.

pub mod approval;
pub mod challenge;
pub mod credential;
pub mod device;
pub mod link;
pub mod subject;

pub use approval::{ApprovalSession, ApprovalStatus};
pub use challenge::Challenge;
pub use credential::{SecretBlob, UserCredential};
pub use device::{DeviceFingerprint, TrustedDevice};
pub use link::MessengerLink;
pub use subject::Subject;
