use crate::contract::model::User;
use crate::domain::timestamp::Timestamp;

/// How long after account creation a confirmation is accepted.
pub const VALIDATION_WINDOW_MS: i64 = 15 * 60 * 1000;

/// Where a stored account sits in its confirmation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    /// Created within the window and not confirmed yet.
    Fresh,
    /// Window elapsed, or the creation stamp is missing or unreadable.
    Expired,
    /// Already confirmed.
    Validated,
}

pub fn validation_state(user: &User, now: &Timestamp) -> ValidationState {
    if !user.validated.is_empty() {
        return ValidationState::Validated;
    }
    match Timestamp::parse(&user.last_login) {
        Ok(login) if login.millis_between(now) <= VALIDATION_WINDOW_MS => ValidationState::Fresh,
        _ => ValidationState::Expired,
    }
}
