//! Statements against the `user` table. Placeholders are positional `?`,
//! which both MySQL and SQLite accept.

pub const SELECT_USER: &str = "SELECT ctpass, ctppic, atoken, llogin, uvalid FROM user \
     WHERE ctuser = ? AND ctprof = ? AND uemail = ?";

pub const INSERT_USER: &str =
    "INSERT INTO user (ctuser, ctpass, ctprof, uemail, ctppic) VALUES (?, ?, ?, ?, ?)";

pub const DELETE_USER: &str = "DELETE FROM user WHERE ctuser = ? AND ctprof = ? AND uemail = ?";

pub const UPDATE_USER: &str = "UPDATE user SET ctpass = ?, ctppic = ?, atoken = ? \
     WHERE ctuser = ? AND ctprof = ? AND uemail = ?";

pub const UPDATE_LAST_LOGIN: &str =
    "UPDATE user SET llogin = ? WHERE ctuser = ? AND ctprof = ? AND uemail = ?";

pub const UPDATE_VALIDATED: &str =
    "UPDATE user SET uvalid = ? WHERE ctuser = ? AND ctprof = ? AND uemail = ?";

pub const CREATE_USER_TABLE: &str = "CREATE TABLE IF NOT EXISTS user (
    ctuser VARCHAR(64) NOT NULL,
    ctpass VARCHAR(128) NULL,
    ctprof VARCHAR(64) NOT NULL,
    ctppic TEXT NULL,
    uemail VARCHAR(255) NOT NULL,
    atoken VARCHAR(512) NULL,
    llogin DATETIME NULL,
    uvalid DATETIME NULL,
    PRIMARY KEY (ctuser, ctprof, uemail)
)";
