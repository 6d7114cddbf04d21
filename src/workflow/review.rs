use chrono::{DateTime, Utc};
use derive_more::Display;

use crate::model::leave::LeaveStatus;
use crate::model::role::Role;
use crate::workflow::policy::{self, Action};

/// Everything the transition rules need to know about the stored row.
#[derive(Debug, Clone)]
pub struct LeaveState {
    pub status: LeaveStatus,
    pub status_decided_at: Option<DateTime<Utc>>,
}

/// The acting reviewer, resolved from the request token.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
}

/// Override bookkeeping carried on the row after an admin reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideMeta {
    pub overridden_from: LeaveStatus,
    pub overridden_at: DateTime<Utc>,
}

/// A validated transition, ready to be written back.
/// `status_decided_at` is `Some` only for the first decision; an
/// override leaves the stored value alone.
#[derive(Debug, Clone)]
pub struct Transition {
    pub new_status: LeaveStatus,
    pub reviewer_id: u64,
    pub comments: Option<String>,
    pub status_decided_at: Option<DateTime<Utc>>,
    pub override_meta: Option<OverrideMeta>,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ReviewError {
    #[display(fmt = "{}", _0)]
    Unauthorized(policy::Denied),
    #[display(fmt = "target status must be approved or rejected")]
    InvalidTarget,
    #[display(fmt = "comments are required when rejecting")]
    CommentsRequired,
    #[display(fmt = "leave is already {}", _0)]
    AlreadyDecided(LeaveStatus),
    #[display(fmt = "leave is still pending; nothing to override")]
    NotDecided,
    #[display(fmt = "override must target the opposite decision")]
    SameDecision,
    #[display(fmt = "decisions can only be overridden on the day they were made")]
    OverrideWindowClosed,
}

fn require_decision_target(target: LeaveStatus) -> Result<(), ReviewError> {
    if target.is_decided() {
        Ok(())
    } else {
        Err(ReviewError::InvalidTarget)
    }
}

/// Rejections carry an explanation, on the single path and the bulk
/// path alike. Checked before anything touches the database.
pub fn require_comments_for_rejection(
    target: LeaveStatus,
    comments: Option<&str>,
) -> Result<(), ReviewError> {
    if target == LeaveStatus::Rejected
        && comments.map(str::trim).filter(|c| !c.is_empty()).is_none()
    {
        return Err(ReviewError::CommentsRequired);
    }
    Ok(())
}

/// Standard review path: `pending -> approved | rejected`.
///
/// Faculty or admin only. Rejection demands non-blank comments on this
/// path as well as the bulk path. Sets `status_decided_at` exactly once.
pub fn review(
    state: &LeaveState,
    target: LeaveStatus,
    comments: Option<&str>,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<Transition, ReviewError> {
    policy::authorize(actor.role, Action::ReviewLeave).map_err(ReviewError::Unauthorized)?;
    require_decision_target(target)?;
    require_comments_for_rejection(target, comments)?;

    if state.status.is_decided() {
        return Err(ReviewError::AlreadyDecided(state.status));
    }

    Ok(Transition {
        new_status: target,
        reviewer_id: actor.id,
        comments: comments.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()),
        status_decided_at: Some(now),
        override_meta: None,
    })
}

/// Admin reversal of a prior decision, valid only on the calendar day
/// (UTC) the decision was made. The original `status_decided_at` is
/// preserved so the window cannot be re-armed by overriding.
pub fn override_decision(
    state: &LeaveState,
    target: LeaveStatus,
    comments: Option<&str>,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<Transition, ReviewError> {
    policy::authorize(actor.role, Action::OverrideDecision).map_err(ReviewError::Unauthorized)?;
    require_decision_target(target)?;
    require_comments_for_rejection(target, comments)?;

    if !state.status.is_decided() {
        return Err(ReviewError::NotDecided);
    }
    if state.status == target {
        return Err(ReviewError::SameDecision);
    }

    let decided_at = state.status_decided_at.ok_or(ReviewError::NotDecided)?;
    if decided_at.date_naive() != now.date_naive() {
        return Err(ReviewError::OverrideWindowClosed);
    }

    Ok(Transition {
        new_status: target,
        reviewer_id: actor.id,
        comments: comments.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()),
        status_decided_at: None,
        override_meta: Some(OverrideMeta {
            overridden_from: state.status,
            overridden_at: now,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn pending() -> LeaveState {
        LeaveState {
            status: LeaveStatus::Pending,
            status_decided_at: None,
        }
    }

    fn decided(status: LeaveStatus, decided_at: DateTime<Utc>) -> LeaveState {
        LeaveState {
            status,
            status_decided_at: Some(decided_at),
        }
    }

    const FACULTY: Actor = Actor {
        id: 7,
        role: Role::Faculty,
    };
    const ADMIN: Actor = Actor {
        id: 1,
        role: Role::Admin,
    };
    const STUDENT: Actor = Actor {
        id: 42,
        role: Role::Student,
    };

    #[test]
    fn faculty_approves_pending_and_sets_decided_at() {
        let now = at(2025, 6, 1, 10);
        let t = review(&pending(), LeaveStatus::Approved, None, FACULTY, now).unwrap();
        assert_eq!(t.new_status, LeaveStatus::Approved);
        assert_eq!(t.reviewer_id, 7);
        assert_eq!(t.status_decided_at, Some(now));
        assert!(t.override_meta.is_none());
    }

    #[test]
    fn student_cannot_review() {
        let err = review(&pending(), LeaveStatus::Approved, None, STUDENT, at(2025, 6, 1, 10))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Unauthorized(_)));
    }

    #[test]
    fn rejection_requires_comments_on_single_path() {
        let now = at(2025, 6, 1, 10);
        let err = review(&pending(), LeaveStatus::Rejected, Some("   "), FACULTY, now).unwrap_err();
        assert_eq!(err, ReviewError::CommentsRequired);

        let t = review(&pending(), LeaveStatus::Rejected, Some("overlaps exams"), FACULTY, now)
            .unwrap();
        assert_eq!(t.comments.as_deref(), Some("overlaps exams"));
    }

    #[test]
    fn comments_rule_refuses_blank_rejection_for_any_path() {
        // The bulk runner consults this predicate up front, before the
        // first item is touched.
        assert_eq!(
            require_comments_for_rejection(LeaveStatus::Rejected, None),
            Err(ReviewError::CommentsRequired)
        );
        assert_eq!(
            require_comments_for_rejection(LeaveStatus::Rejected, Some("")),
            Err(ReviewError::CommentsRequired)
        );
        assert_eq!(
            require_comments_for_rejection(LeaveStatus::Rejected, Some("  \t ")),
            Err(ReviewError::CommentsRequired)
        );
        assert_eq!(
            require_comments_for_rejection(LeaveStatus::Rejected, Some("clash")),
            Ok(())
        );
    }

    #[test]
    fn comments_rule_leaves_approvals_alone() {
        assert_eq!(
            require_comments_for_rejection(LeaveStatus::Approved, None),
            Ok(())
        );
    }

    #[test]
    fn decided_leave_cannot_be_reviewed_again() {
        let state = decided(LeaveStatus::Approved, at(2025, 6, 1, 9));
        let err =
            review(&state, LeaveStatus::Rejected, Some("no"), ADMIN, at(2025, 6, 1, 10)).unwrap_err();
        assert_eq!(err, ReviewError::AlreadyDecided(LeaveStatus::Approved));
    }

    #[test]
    fn pending_cannot_be_target() {
        let err =
            review(&pending(), LeaveStatus::Pending, None, FACULTY, at(2025, 6, 1, 10)).unwrap_err();
        assert_eq!(err, ReviewError::InvalidTarget);
    }

    #[test]
    fn same_day_admin_override_flips_decision() {
        let decided_at = at(2025, 6, 1, 9);
        let state = decided(LeaveStatus::Approved, decided_at);
        let t = override_decision(
            &state,
            LeaveStatus::Rejected,
            Some("policy violation found"),
            ADMIN,
            at(2025, 6, 1, 17),
        )
        .unwrap();

        assert_eq!(t.new_status, LeaveStatus::Rejected);
        // First decision timestamp survives the override.
        assert_eq!(t.status_decided_at, None);
        let meta = t.override_meta.unwrap();
        assert_eq!(meta.overridden_from, LeaveStatus::Approved);
        assert_eq!(meta.overridden_at, at(2025, 6, 1, 17));
    }

    #[test]
    fn next_day_override_is_refused() {
        let state = decided(LeaveStatus::Approved, at(2025, 6, 1, 9));
        let err = override_decision(
            &state,
            LeaveStatus::Rejected,
            Some("too late"),
            ADMIN,
            at(2025, 6, 2, 0),
        )
        .unwrap_err();
        assert_eq!(err, ReviewError::OverrideWindowClosed);
    }

    #[test]
    fn faculty_cannot_override() {
        let state = decided(LeaveStatus::Approved, at(2025, 6, 1, 9));
        let err = override_decision(
            &state,
            LeaveStatus::Rejected,
            Some("nope"),
            FACULTY,
            at(2025, 6, 1, 10),
        )
        .unwrap_err();
        assert!(matches!(err, ReviewError::Unauthorized(_)));
    }

    #[test]
    fn override_must_flip_the_decision() {
        let state = decided(LeaveStatus::Approved, at(2025, 6, 1, 9));
        let err = override_decision(&state, LeaveStatus::Approved, None, ADMIN, at(2025, 6, 1, 10))
            .unwrap_err();
        assert_eq!(err, ReviewError::SameDecision);
    }

    #[test]
    fn pending_leave_has_nothing_to_override() {
        let err = override_decision(
            &pending(),
            LeaveStatus::Rejected,
            Some("x"),
            ADMIN,
            at(2025, 6, 1, 10),
        )
        .unwrap_err();
        assert_eq!(err, ReviewError::NotDecided);
    }

    #[test]
    fn override_back_to_approved_needs_no_comments() {
        let state = decided(LeaveStatus::Rejected, at(2025, 6, 1, 9));
        let t = override_decision(&state, LeaveStatus::Approved, None, ADMIN, at(2025, 6, 1, 10))
            .unwrap();
        assert_eq!(t.new_status, LeaveStatus::Approved);
    }
}
