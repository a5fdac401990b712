//! Out-of-band approval flow.
//!
//! Challenge issuance, messenger linking, PENDING approval sessions,
//! and the watcher that polls for a resolution while racing an
//! independent kick-after timeout.

mod flow;
mod watcher;

pub use flow::{ApprovalFlow, IssuedChallenge, JoinApproval};
