use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle state of an application. Any state may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Created,
    InProgress,
    Done,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Created => "created",
            ApplicationStatus::InProgress => "inprogress",
            ApplicationStatus::Done => "done",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or submitted status string is not one of the known states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown application status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ApplicationStatus::Created),
            "inprogress" => Ok(ApplicationStatus::InProgress),
            "done" => Ok(ApplicationStatus::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A service request filed by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub creator_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub type_id: Uuid,
    pub subtype_id: Uuid,
    pub text: String,
    pub photo_ids: Vec<Uuid>,
    pub performer_id: Option<Uuid>,
    pub performer_time: Option<DateTime<Utc>>,
}

/// Data for filing a new application. Identity, timestamps and the initial
/// status are assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub creator_id: Uuid,
    pub type_id: Uuid,
    pub subtype_id: Uuid,
    pub text: String,
    pub photo_ids: Vec<Uuid>,
}

/// Sparse update. Only the fields that are `Some` are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub performer_id: Option<Uuid>,
    pub performer_time: Option<DateTime<Utc>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.performer_id.is_none() && self.performer_time.is_none()
    }
}

/// Equality filters for listing applications; absent fields do not constrain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationFilter {
    pub performer_id: Option<Uuid>,
    pub creator_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
    pub type_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationType {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSubtype {
    pub id: Uuid,
    pub title: String,
    pub type_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtypeFilter {
    pub type_id: Option<Uuid>,
}

/// A registered user. Soft-deleted users are never returned, so the stored
/// `deleted_at` timestamp has no field here: every `User` is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub role: Option<String>,
}
