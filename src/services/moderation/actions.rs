// Moderation Actions
// Applies automatic and admin decisions to user records and sweeps expired suspensions

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    AccountState, Action, ActionKind, AdminNote, ManualAction, ModerationStatus, NoteKind, Severity,
    UserModerationRecord, ViolationKind, ViolationRecord,
};

use super::escalation::EscalationEngine;
use super::policy::{check_suspension_hours, MAX_SUSPENSION_HOURS};
use super::ModerationError;

/// Access to the user store's moderation records. The caller serializes
/// read-modify-write per user.
pub trait ModerationRecords {
    fn get_mut(&mut self, user_id: &str) -> Option<&mut UserModerationRecord>;
    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut UserModerationRecord> + '_>;
}

impl ModerationRecords for HashMap<String, UserModerationRecord> {
    fn get_mut(&mut self, user_id: &str) -> Option<&mut UserModerationRecord> {
        HashMap::get_mut(self, user_id)
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut UserModerationRecord> + '_> {
        Box::new(self.values_mut())
    }
}

impl ModerationRecords for Vec<UserModerationRecord> {
    fn get_mut(&mut self, user_id: &str) -> Option<&mut UserModerationRecord> {
        self.as_mut_slice().iter_mut().find(|r| r.user_id == user_id)
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut UserModerationRecord> + '_> {
        Box::new(self.as_mut_slice().iter_mut())
    }
}

/// State an account returns to when no suspension or ban applies.
fn idle_state(status: &ModerationStatus) -> AccountState {
    if status.shadow_banned {
        AccountState::ShadowBanned
    } else {
        AccountState::Active
    }
}

fn violation(
    kind: ViolationKind,
    reason: &str,
    severity: Option<Severity>,
    report_id: Option<&str>,
    admin_id: Option<&str>,
    now: DateTime<Utc>,
) -> ViolationRecord {
    ViolationRecord {
        id: Uuid::new_v4(),
        timestamp: now,
        kind,
        reason: reason.to_string(),
        severity,
        report_id: report_id.map(str::to_string),
        admin_action: admin_id.is_some(),
        admin_id: admin_id.map(str::to_string),
    }
}

/// End of a suspension of `hours` starting at `now`.
fn suspension_end(hours: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, ModerationError> {
    let hours = check_suspension_hours(hours)?;
    Duration::try_hours(hours)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or(ModerationError::InvalidDuration(hours))
}

fn suspend(status: &mut ModerationStatus, until: DateTime<Utc>, now: DateTime<Utc>) {
    status.state = AccountState::Suspended { until };
    status.suspension_count += 1;
    status.last_suspension_at = Some(now);
}

fn ban(status: &mut ModerationStatus, reason: &str) {
    // A second ban keeps the first reason.
    if !status.is_banned() {
        status.state = AccountState::Banned {
            reason: reason.to_string(),
        };
    }
}

impl EscalationEngine {
    /// Decide and apply the automatic consequence of a confirmed violation.
    /// Appends one violation record and one automatic-action note.
    pub fn apply_violation(
        &self,
        record: &mut UserModerationRecord,
        severity: Severity,
        reason: &str,
        report_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Action {
        let action = self.determine_action(&record.status, severity, now);
        let status = &mut record.status;

        let warnings = self.effective_warning_count(status, now);
        status.warning_count = warnings;
        status.total_violations += 1;

        if matches!(severity, Severity::Low | Severity::Medium) && !matches!(action.kind, ActionKind::Ban) {
            status.warning_count = warnings + 1;
            status.last_warning_at = Some(now);
        }

        match action.kind {
            ActionKind::Warning => {
                if status.state == AccountState::Active {
                    status.state = AccountState::Warned;
                }
            }
            ActionKind::Suspension => {
                let hours = action.duration_hours.unwrap_or(self.policy().high_suspension_hours);
                let until = suspension_end(hours.clamp(1, MAX_SUSPENSION_HOURS), now).unwrap_or_else(|e| {
                    warn!(user_id = %record.user_id, error = %e, "[moderation] suspension end out of range, suspending indefinitely");
                    DateTime::<Utc>::MAX_UTC
                });
                suspend(status, until, now);
            }
            ActionKind::Ban => ban(status, reason),
            ActionKind::ShadowBan => {
                status.shadow_banned = true;
            }
        }

        record.violations.push(violation(
            action.kind.violation_kind(),
            reason,
            Some(severity),
            report_id,
            None,
            now,
        ));
        record.notes.push(AdminNote::new(
            NoteKind::AutomaticAction,
            format!("{} ({} severity): {}", action.message, severity, reason),
            None,
            now,
        ));

        info!(
            user_id = %record.user_id,
            severity = %severity,
            action = ?action.kind,
            state = record.status.status_label(),
            "[moderation] applied automatic action"
        );

        action
    }

    /// Apply an admin action directly, bypassing `determine_action`.
    pub fn apply_manual_action<R>(
        &self,
        records: &mut R,
        user_id: &str,
        action: &ManualAction,
        reason: &str,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ModerationStatus, ModerationError>
    where
        R: ModerationRecords + ?Sized,
    {
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| ModerationError::UserNotFound(user_id.to_string()))?;

        if record.status.is_banned() && !action.is_lifting() {
            warn!(user_id, action = action.as_str(), "[moderation] rejected manual action on banned account");
            return Err(ModerationError::AccountBanned(user_id.to_string()));
        }

        let penalty = match action {
            ManualAction::Warning => {
                let status = &mut record.status;
                status.warning_count = self.effective_warning_count(status, now) + 1;
                status.last_warning_at = Some(now);
                if status.state == AccountState::Active {
                    status.state = AccountState::Warned;
                }
                Some(ViolationKind::Warning)
            }
            ManualAction::Suspension { hours } => {
                let hours = hours.unwrap_or(self.policy().manual_suspension_hours);
                let until = suspension_end(hours, now)?;
                suspend(&mut record.status, until, now);
                Some(ViolationKind::Suspension)
            }
            ManualAction::Ban => {
                ban(&mut record.status, reason);
                Some(ViolationKind::Ban)
            }
            ManualAction::ShadowBan => {
                let status = &mut record.status;
                status.shadow_banned = true;
                if matches!(status.state, AccountState::Active | AccountState::Warned) {
                    status.state = AccountState::ShadowBanned;
                }
                Some(ViolationKind::ShadowBan)
            }
            ManualAction::ClearShadowBan => {
                let status = &mut record.status;
                status.shadow_banned = false;
                if status.state == AccountState::ShadowBanned {
                    status.state = AccountState::Active;
                }
                None
            }
            ManualAction::Unban | ManualAction::Reactivate => {
                record.status.state = idle_state(&record.status);
                None
            }
        };

        if let Some(kind) = penalty {
            record.status.total_violations += 1;
            record
                .violations
                .push(violation(kind, reason, None, None, Some(admin_id), now));
        }

        let note_kind = match action {
            ManualAction::Unban | ManualAction::Reactivate => NoteKind::Reactivation,
            _ => NoteKind::ManualAction,
        };
        record.notes.push(AdminNote::new(
            note_kind,
            format!("Manual {}: {}", action.as_str(), reason),
            Some(admin_id),
            now,
        ));

        info!(
            user_id,
            admin_id,
            action = action.as_str(),
            state = record.status.status_label(),
            "[moderation] applied manual action"
        );

        Ok(record.status.clone())
    }

    /// Lift every suspension that ended before `now`. Returns the ids of the
    /// reactivated users; nobody else is touched.
    pub fn check_expired_suspensions<R>(&self, records: &mut R, now: DateTime<Utc>) -> Vec<String>
    where
        R: ModerationRecords + ?Sized,
    {
        let mut reactivated = Vec::new();

        for record in records.iter_mut() {
            let expired = matches!(record.status.state, AccountState::Suspended { until } if until < now);
            if !expired {
                continue;
            }
            record.status.state = idle_state(&record.status);
            record.notes.push(AdminNote::new(
                NoteKind::Reactivation,
                "Suspension expired; account reactivated automatically",
                None,
                now,
            ));
            reactivated.push(record.user_id.clone());
        }

        if !reactivated.is_empty() {
            info!(count = reactivated.len(), "[moderation] reactivated expired suspensions");
        }
        reactivated
    }
}
