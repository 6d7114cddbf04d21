use crate::model::role::Role;
use derive_more::Display;

/// Every privileged operation in the service, in one place.
/// Handlers and the review state machine consult this instead of
/// comparing role strings inline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    SubmitLeave,
    ReviewLeave,
    OverrideDecision,
    ViewReports,
    ViewAuditLog,
}

#[derive(Debug, Display, PartialEq, Eq)]
#[display(fmt = "role '{}' may not {:?}", "_0.as_str()", _1)]
pub struct Denied(pub Role, pub Action);

pub fn authorize(role: Role, action: Action) -> Result<(), Denied> {
    let allowed = match action {
        // Students and faculty submit for themselves; admins administer.
        Action::SubmitLeave => matches!(role, Role::Student | Role::Faculty),
        Action::ReviewLeave => matches!(role, Role::Faculty | Role::Admin),
        Action::OverrideDecision => role == Role::Admin,
        Action::ViewReports => matches!(role, Role::Faculty | Role::Admin),
        Action::ViewAuditLog => role == Role::Admin,
    };

    if allowed { Ok(()) } else { Err(Denied(role, action)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_cannot_review() {
        assert!(authorize(Role::Student, Action::ReviewLeave).is_err());
        assert!(authorize(Role::Faculty, Action::ReviewLeave).is_ok());
        assert!(authorize(Role::Admin, Action::ReviewLeave).is_ok());
    }

    #[test]
    fn only_admin_overrides() {
        assert!(authorize(Role::Admin, Action::OverrideDecision).is_ok());
        assert!(authorize(Role::Faculty, Action::OverrideDecision).is_err());
        assert!(authorize(Role::Student, Action::OverrideDecision).is_err());
    }

    #[test]
    fn admins_do_not_submit_leaves() {
        assert!(authorize(Role::Admin, Action::SubmitLeave).is_err());
        assert!(authorize(Role::Student, Action::SubmitLeave).is_ok());
    }

    #[test]
    fn audit_log_is_admin_only() {
        assert!(authorize(Role::Admin, Action::ViewAuditLog).is_ok());
        assert!(authorize(Role::Faculty, Action::ViewAuditLog).is_err());
    }
}
