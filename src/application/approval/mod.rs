//! Registration approval workflow and password resets.

pub mod service;

pub use service::{ApprovalService, Registration};
