use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::contract::error::KeyError;

/// Prefix marking a password as an already-hashed value.
pub const PWD_HASH_TAG: &str = "H:";

/// Prefix marking a profile picture as an object-store key.
pub const PIC_KEY_TAG: &str = "O:";

/// One user account record as exchanged on the wire.
///
/// Identified by the composite key (`user_id`, `profile`, `email`).
/// `last_login` and `validated` are 14-digit `YYYYMMDDHHMMSS` UTC stamps;
/// `validated` stays empty until the account is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "ctuser")]
    pub user_id: String,
    #[serde(rename = "ctpass")]
    pub password: String,
    #[serde(rename = "ctprof")]
    pub profile: String,
    /// Tagged object key or inline base64 image.
    #[serde(rename = "ctppic")]
    pub picture: String,
    #[serde(rename = "uemail")]
    pub email: String,
    #[serde(rename = "atoken")]
    pub token: String,
    #[serde(rename = "llogin")]
    pub last_login: String,
    #[serde(rename = "uvalid")]
    pub validated: String,
    /// Image file type of an inline picture, e.g. `png`. Never persisted.
    #[serde(rename = "ctimgt", skip_serializing_if = "String::is_empty")]
    pub image_type: String,
}

/// Request envelope; the first entry is the record being acted on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
}

impl User {
    pub fn new(
        user_id: impl Into<String>,
        profile: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            profile: profile.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Check the composite key, reporting the first missing part.
    pub fn validate_key(&self) -> Result<(), KeyError> {
        if self.user_id.is_empty() {
            Err(KeyError::NoUserId)
        } else if self.profile.is_empty() {
            Err(KeyError::NoProfileId)
        } else if self.email.is_empty() {
            Err(KeyError::NoEmailAddress)
        } else {
            Ok(())
        }
    }

    /// Record holding only the composite key.
    pub fn key_only(&self) -> Self {
        Self::new(&self.user_id, &self.profile, &self.email)
    }

    pub fn has_text_pwd(&self) -> bool {
        !self.password.starts_with(PWD_HASH_TAG)
    }

    /// Hashed form of the password.
    ///
    /// A plaintext password is hashed with SHA-256 (lowercase hex) and
    /// prefixed with [`PWD_HASH_TAG`] when `tagged`. An already hashed
    /// password is returned as is when `tagged`, or with its tag removed.
    pub fn pwd_hash(&self, tagged: bool) -> String {
        if let Some(bare) = self.password.strip_prefix(PWD_HASH_TAG) {
            return if tagged {
                self.password.clone()
            } else {
                bare.to_string()
            };
        }

        let digest = hex::encode(Sha256::digest(self.password.as_bytes()));
        if tagged {
            format!("{PWD_HASH_TAG}{digest}")
        } else {
            digest
        }
    }

    /// Same account state: key, picture, token and password compared in
    /// tagged-hash form, so plaintext and hashed copies of one password match.
    pub fn matches(&self, other: &User) -> bool {
        self.user_id == other.user_id
            && self.profile == other.profile
            && self.email == other.email
            && self.picture == other.picture
            && self.token == other.token
            && self.pwd_hash(true) == other.pwd_hash(true)
    }

    pub fn has_profile_pic_key(&self) -> bool {
        self.picture.starts_with(PIC_KEY_TAG)
    }

    /// Object key of a stored picture, without its tag.
    pub fn profile_pic_key(&self) -> Option<&str> {
        self.picture.strip_prefix(PIC_KEY_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_SHA256: &str = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b";

    fn alice() -> User {
        User {
            password: "secret".into(),
            ..User::new("alice", "p1", "a@x.com")
        }
    }

    #[test]
    fn wire_names() {
        let u: User = serde_json::from_str(
            r#"{"ctuser":"alice","ctprof":"p1","uemail":"a@x.com","ctpass":"secret","ctimgt":"png"}"#,
        )
        .unwrap();
        assert_eq!(u.user_id, "alice");
        assert_eq!(u.image_type, "png");
        assert!(u.validated.is_empty());

        let v = serde_json::to_value(User::new("a", "b", "c")).unwrap();
        assert_eq!(v["ctuser"], "a");
        assert_eq!(v["uvalid"], "");
        assert!(v.get("ctimgt").is_none());
    }

    #[test]
    fn key_validation_order() {
        assert_eq!(User::new("", "", "").validate_key(), Err(KeyError::NoUserId));
        assert_eq!(User::new("u", "", "").validate_key(), Err(KeyError::NoProfileId));
        assert_eq!(User::new("u", "p", "").validate_key(), Err(KeyError::NoEmailAddress));
        assert_eq!(User::new("u", "p", "e").validate_key(), Ok(()));
    }

    #[test]
    fn tagged_hash_of_plaintext() {
        let u = alice();
        assert!(u.has_text_pwd());
        assert_eq!(u.pwd_hash(true), format!("H:{SECRET_SHA256}"));
    }

    #[test]
    fn tagged_hash_is_idempotent() {
        let mut u = alice();
        u.password = u.pwd_hash(true);
        assert!(!u.has_text_pwd());
        assert_eq!(u.pwd_hash(true), u.password);
        assert_eq!(u.pwd_hash(false), SECRET_SHA256);
    }

    // Untagged form of a plaintext password is the bare digest. Cutting the
    // tag length off the plaintext itself would break `matches`.
    #[test]
    fn untagged_hash_of_plaintext_is_bare_digest_not_prefix_strip() {
        let u = alice();
        assert_eq!(u.pwd_hash(false), SECRET_SHA256);
        assert_ne!(u.pwd_hash(false), "cret");
        assert_eq!(format!("{PWD_HASH_TAG}{}", u.pwd_hash(false)), u.pwd_hash(true));
    }

    #[test]
    fn matches_compares_hashed_passwords() {
        let plain = alice();
        let mut stored = alice();
        stored.password = plain.pwd_hash(true);
        stored.last_login = "20240101120000".into();
        assert!(plain.matches(&stored));
        assert!(stored.matches(&plain));

        let mut other = stored.clone();
        other.token = "tok".into();
        assert!(!plain.matches(&other));
    }

    #[test]
    fn picture_key_helpers() {
        let mut u = alice();
        u.picture = "iVBORw0KGgo=".into();
        assert!(!u.has_profile_pic_key());
        assert_eq!(u.profile_pic_key(), None);

        u.picture = "O:alice/p1/image.png".into();
        assert!(u.has_profile_pic_key());
        assert_eq!(u.profile_pic_key(), Some("alice/p1/image.png"));
    }

    #[test]
    fn key_only_drops_everything_else() {
        let k = alice().key_only();
        assert_eq!(k, User::new("alice", "p1", "a@x.com"));
    }
}
