//! User identity, role, and profile data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the user identifier inside profile documents.
pub const UID_FIELD: &str = "uid";
/// Field holding the role inside lookup and profile documents.
pub const ROLE_FIELD: &str = "userType";
/// Field holding the email inside lookup and profile documents.
pub const EMAIL_FIELD: &str = "email";
/// Server-assigned creation timestamp field.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Arbitrary role-specific profile payload.
pub type ProfileData = Map<String, Value>;

/// Validation errors returned by [`UserId`] and [`Email`] constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Identifier was empty.
    EmptyId,
    /// Identifier had surrounding whitespace or a path separator.
    InvalidId,
    /// Email was empty.
    EmptyEmail,
    /// Email did not look like an address.
    InvalidEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(
                f,
                "user id must not contain surrounding whitespace or '/'",
            ),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must contain '@'"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Backend-issued user identifier.
///
/// The value is opaque; it only has to be usable as a document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    ///
    /// # Examples
    /// ```
    /// use carelink::domain::UserId;
    ///
    /// let id = UserId::new("Xk3pQ9").expect("valid id");
    /// assert_eq!(id.as_ref(), "Xk3pQ9");
    /// assert!(UserId::new("a/b").is_err());
    /// ```
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id || id.contains('/') {
            return Err(UserValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address written to the identity lookup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(email: impl Into<String>) -> Result<Self, UserValidationError> {
        let email = email.into();
        let trimmed = email.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if !trimmed.contains('@') {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned when a role string is not one of the recognised values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised role '{value}': expected 'patient' or 'caretaker'")]
pub struct RoleValidationError {
    /// The rejected input.
    pub value: String,
}

/// Collections used by the profile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Identity lookup records keyed by user id.
    Users,
    /// Patient profile documents.
    Patients,
    /// Caretaker profile documents.
    Caretakers,
}

impl Collection {
    /// Collection name as stored in the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Patients => "patients",
            Self::Caretakers => "caretakers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a user; decides which collection holds the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A person receiving care.
    Patient,
    /// A person providing care.
    Caretaker,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Caretaker => "caretaker",
        }
    }

    /// Collection holding profile documents for this role.
    #[must_use]
    pub const fn partition(self) -> Collection {
        match self {
            Self::Patient => Collection::Patients,
            Self::Caretaker => Collection::Caretakers,
        }
    }

    /// Interpret a role read back from an existing lookup record.
    ///
    /// Records written before roles were validated may hold any string; those
    /// resolve to [`Role::Caretaker`], the partition they were written to.
    ///
    /// # Examples
    /// ```
    /// use carelink::domain::Role;
    ///
    /// assert_eq!(Role::from_stored("patient"), Role::Patient);
    /// assert_eq!(Role::from_stored("admin"), Role::Caretaker);
    /// ```
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Caretaker)
    }
}

impl FromStr for Role {
    type Err = RoleValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "patient" => Ok(Self::Patient),
            "caretaker" => Ok(Self::Caretaker),
            other => Err(RoleValidationError {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity lookup record stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Identifier the record is keyed by.
    pub id: UserId,
    /// Email captured at registration; empty when the record lacks one.
    pub email: String,
    /// Role deciding the profile partition.
    pub role: Role,
    /// Server-assigned creation time, when present and parseable.
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Decode a lookup record from stored document fields.
    ///
    /// Missing or non-string `userType` values fall back the same way as
    /// [`Role::from_stored`].
    #[must_use]
    pub fn from_fields(id: UserId, fields: &Map<String, Value>) -> Self {
        let email = fields
            .get(EMAIL_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let role = Role::from_stored(
            fields
                .get(ROLE_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        Self {
            id,
            email,
            role,
            created_at: created_at_of(fields),
        }
    }

    /// Fields written for a new lookup record, excluding server timestamps.
    #[must_use]
    pub fn registration_fields(email: &Email, role: Role) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(EMAIL_FIELD.to_owned(), Value::from(email.as_ref()));
        fields.insert(ROLE_FIELD.to_owned(), Value::from(role.as_str()));
        fields
    }
}

/// Role-specific profile document.
///
/// ## Invariants
/// - `id` and `role` match the identity lookup record the document was
///   resolved through.
/// - `fields` is the stored document verbatim, denormalised fields included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    id: UserId,
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    fields: Map<String, Value>,
}

impl ProfileDocument {
    /// Build a profile from the stored fields of its partition document.
    #[must_use]
    pub fn new(id: UserId, role: Role, fields: Map<String, Value>) -> Self {
        let created_at = created_at_of(&fields);
        Self {
            id,
            role,
            created_at,
            fields,
        }
    }

    /// Fields written for a new profile, excluding server timestamps.
    ///
    /// Denormalised `uid` and `userType` override same-named payload fields.
    #[must_use]
    pub fn registration_fields(id: &UserId, role: Role, profile: ProfileData) -> Map<String, Value> {
        let mut fields = profile;
        fields.insert(UID_FIELD.to_owned(), Value::from(id.as_ref()));
        fields.insert(ROLE_FIELD.to_owned(), Value::from(role.as_str()));
        fields
    }

    /// Owner of the profile.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Role the profile was stored under.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Server-assigned creation time, when present and parseable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Stored fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up one stored field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Consume the profile, returning its stored fields.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

fn created_at_of(fields: &Map<String, Value>) -> Option<DateTime<Utc>> {
    fields
        .get(CREATED_AT_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests;
