// Moderation Module
// Graduated account penalties: warning ladder, suspensions, bans and expiry
// - policy: Ladder and escalation settings
// - escalation: The automatic transition function
// - actions: Applying decisions and admin actions to user records

pub mod policy;
pub mod escalation;
pub mod actions;

use thiserror::Error;

pub use policy::{LadderStep, ModerationPolicy, MAX_SUSPENSION_HOURS};
pub use escalation::EscalationEngine;
pub use actions::ModerationRecords;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModerationError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("account {0} is banned; only unban or reactivate apply")]
    AccountBanned(String),
    #[error("invalid suspension duration: {0} hours")]
    InvalidDuration(i64),
    #[error("invalid warning reset period: {0} days")]
    InvalidResetPeriod(i64),
}
