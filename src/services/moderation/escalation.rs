// Escalation Engine
// Chooses the next automatic consequence from a user's current status and a violation severity

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Action, ModerationStatus, Severity};

use super::policy::ModerationPolicy;

#[derive(Debug, Clone, Default)]
pub struct EscalationEngine {
    policy: ModerationPolicy,
}

impl EscalationEngine {
    pub fn new(policy: ModerationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// Warning count after applying the reset window. A count whose last
    /// warning is older than the window no longer counts.
    pub fn effective_warning_count(&self, status: &ModerationStatus, now: DateTime<Utc>) -> u32 {
        match status.last_warning_at {
            Some(last) if now - last > self.policy.reset_period() => 0,
            _ => status.warning_count,
        }
    }

    /// Pure transition function: what should happen for a new violation of
    /// `severity` by a user in `status`.
    pub fn determine_action(&self, status: &ModerationStatus, severity: Severity, now: DateTime<Utc>) -> Action {
        // Any violation while suspended or banned ends in a ban, whatever its severity.
        if status.is_suspended() || status.is_banned() {
            debug!(state = status.status_label(), "[moderation] restricted account, escalating to ban");
            return Action::ban();
        }

        let warnings = self.effective_warning_count(status, now);

        match severity {
            Severity::Critical => Action::suspension(self.policy.critical_suspension_hours),
            Severity::High => {
                if status.suspension_count >= self.policy.high_ban_after_suspensions {
                    Action::ban()
                } else {
                    Action::suspension(self.policy.high_suspension_hours)
                }
            }
            Severity::Medium | Severity::Low => self.policy.ladder_action(warnings + 1, status.suspension_count),
        }
    }
}
