// Moderation Policy
// Warning ladder, suspension escalation and reset period used by the escalation engine

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Action;

use super::ModerationError;

/// Longest suspension any policy or admin may issue (100 years).
pub const MAX_SUSPENSION_HOURS: i64 = 24 * 365 * 100;
const MAX_WARNING_RESET_DAYS: i64 = 365 * 100;

/// Consequence for the Nth warning-level violation inside the reset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LadderStep {
    Warning,
    Suspension { hours: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationPolicy {
    /// Days without a warning after which the warning count starts over.
    #[serde(default = "default_warning_reset_days")]
    pub warning_reset_days: i64,
    #[serde(default = "default_ladder")]
    pub ladder: BTreeMap<u32, LadderStep>,
    /// Suspension lengths used once the ladder is exhausted, indexed by prior suspensions.
    #[serde(default = "default_escalation_hours")]
    pub escalation_hours: Vec<i64>,
    #[serde(default = "default_critical_suspension_hours")]
    pub critical_suspension_hours: i64,
    #[serde(default = "default_high_suspension_hours")]
    pub high_suspension_hours: i64,
    #[serde(default = "default_high_ban_after_suspensions")]
    pub high_ban_after_suspensions: u32,
    /// Length of a manual suspension issued without an explicit duration.
    #[serde(default = "default_manual_suspension_hours")]
    pub manual_suspension_hours: i64,
}

fn default_warning_reset_days() -> i64 { 30 }
fn default_critical_suspension_hours() -> i64 { 168 }
fn default_high_suspension_hours() -> i64 { 24 }
fn default_high_ban_after_suspensions() -> u32 { 2 }
fn default_manual_suspension_hours() -> i64 { 24 }

fn default_ladder() -> BTreeMap<u32, LadderStep> {
    BTreeMap::from([
        (1, LadderStep::Warning),
        (2, LadderStep::Warning),
        (3, LadderStep::Suspension { hours: 24 }),
    ])
}

fn default_escalation_hours() -> Vec<i64> {
    vec![24, 24 * 7, 24 * 30]
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            warning_reset_days: default_warning_reset_days(),
            ladder: default_ladder(),
            escalation_hours: default_escalation_hours(),
            critical_suspension_hours: default_critical_suspension_hours(),
            high_suspension_hours: default_high_suspension_hours(),
            high_ban_after_suspensions: default_high_ban_after_suspensions(),
            manual_suspension_hours: default_manual_suspension_hours(),
        }
    }
}

impl ModerationPolicy {
    pub fn reset_period(&self) -> Duration {
        Duration::try_days(self.warning_reset_days).unwrap_or(Duration::MAX)
    }

    /// Reject durations that are not positive or that could overflow a timestamp.
    pub fn validate(&self) -> Result<(), ModerationError> {
        if !(1..=MAX_WARNING_RESET_DAYS).contains(&self.warning_reset_days) {
            return Err(ModerationError::InvalidResetPeriod(self.warning_reset_days));
        }

        let ladder_hours = self.ladder.values().filter_map(|step| match step {
            LadderStep::Suspension { hours } => Some(*hours),
            LadderStep::Warning => None,
        });
        let fixed = [
            self.critical_suspension_hours,
            self.high_suspension_hours,
            self.manual_suspension_hours,
        ];

        for hours in ladder_hours.chain(self.escalation_hours.iter().copied()).chain(fixed) {
            check_suspension_hours(hours)?;
        }
        Ok(())
    }

    /// Action for the `warning_number`th warning-level violation. Past the
    /// ladder, suspensions lengthen with the user's suspension history.
    pub fn ladder_action(&self, warning_number: u32, suspension_count: u32) -> Action {
        match self.ladder.get(&warning_number) {
            Some(LadderStep::Warning) => Action::warning(warning_number),
            Some(LadderStep::Suspension { hours }) => Action::suspension(*hours),
            None => Action::suspension(self.escalation_for(suspension_count)),
        }
    }

    /// `escalation[min(suspensions + 1, len) - 1]`
    pub fn escalation_for(&self, suspension_count: u32) -> i64 {
        if self.escalation_hours.is_empty() {
            return self.high_suspension_hours;
        }
        let len = self.escalation_hours.len();
        let idx = (suspension_count as usize + 1).min(len) - 1;
        self.escalation_hours[idx]
    }
}

pub(crate) fn check_suspension_hours(hours: i64) -> Result<i64, ModerationError> {
    if (1..=MAX_SUSPENSION_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ModerationError::InvalidDuration(hours))
    }
}
