//! User aggregate
//!
//! Contains the User entity, its approval state machine, password reset
//! tokens and the repository interfaces.

pub mod model;
pub mod repository;
pub mod reset_token;

pub use model::{ApprovalState, User, UserFilter, UserStats};
pub use repository::{UserMutation, UserRepository};
pub use reset_token::{PasswordResetToken, ResetTokenRepository};
