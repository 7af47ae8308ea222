//! Domain primitives shared by the identity, search and service layers.
//!
//! Error codes and status kinds keep the integer values callers persist or
//! exchange, while the Rust side works with enums instead of bare integers.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage format for every identity timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats accepted for timestamp search criteria.
pub const SEARCH_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Current UTC time in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp. Returns `None` for anything not in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Unique identifier of a user account.
///
/// # Examples
///
/// ```rust
/// use usrkit::domain::UserId;
///
/// let id = UserId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i32);

impl UserId {
    /// Creates a new `UserId` from a raw i32 value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "UserId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for i32 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Reason an authentication attempt was rejected.
///
/// Checks run in declaration order of precedence: inactive, then disabled,
/// then the password itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum AuthErrorCode {
    Invalid = 1,
    Inactive = 2,
    Disabled = 3,
}

impl AuthErrorCode {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid username or password.",
            Self::Inactive => "User account has not been activated yet.",
            Self::Disabled => "User account has been disabled.",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of comparing a candidate activation key with the stored one.
///
/// `None` is the no-error sentinel (code 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum ActivationKeyStatus {
    None = 0,
    Invalid = 1,
    TooOld = 2,
}

impl ActivationKeyStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Account flag targeted by an administrative toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum StatusKind {
    EmailVerified = 0,
    IsActive = 1,
    IsDisabled = 2,
}

impl StatusKind {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for StatusKind {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::EmailVerified),
            1 => Ok(Self::IsActive),
            2 => Ok(Self::IsDisabled),
            other => Err(format!("Unknown status kind: {other}")),
        }
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verified" | "email-verified" | "email_verified" => Ok(Self::EmailVerified),
            "active" | "is-active" | "is_active" => Ok(Self::IsActive),
            "disabled" | "is-disabled" | "is_disabled" => Ok(Self::IsDisabled),
            other => Err(format!(
                "Unknown status '{other}'. Use: verified, active, disabled"
            )),
        }
    }
}
