//! Plain-text response bodies.

use crate::contract::model::User;

/// What a mutating function reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Deleted,
    Updated,
    Validated,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Added => "added",
            Outcome::Deleted => "deleted",
            Outcome::Updated => "updated",
            Outcome::Validated => "validated",
        }
    }
}

pub fn user_info_body(u: &User) -> String {
    format!(
        "{{'username': '{}', 'profile': '{}', 'email': '{}', 'imageLoc': '{}', 'lastOn': '{}', 'validatedOn': '{}'}}\n",
        u.user_id, u.profile, u.email, u.picture, u.last_login, u.validated
    )
}

pub fn outcome_body(u: &User, outcome: Outcome) -> String {
    format!(
        "{{'username': '{}', 'profile': '{}', 'result': '{}'}}\n",
        u.user_id,
        u.profile,
        outcome.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies() {
        let mut u = User::new("alice", "p1", "a@x.com");
        u.picture = "O:alice/p1/image.png".into();
        u.last_login = "20240601100000".into();
        assert_eq!(
            user_info_body(&u),
            "{'username': 'alice', 'profile': 'p1', 'email': 'a@x.com', 'imageLoc': 'O:alice/p1/image.png', 'lastOn': '20240601100000', 'validatedOn': ''}\n"
        );
        assert_eq!(
            outcome_body(&u, Outcome::Deleted),
            "{'username': 'alice', 'profile': 'p1', 'result': 'deleted'}\n"
        );
    }
}
