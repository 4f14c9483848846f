use chrono::{DateTime, Utc};
use paging::{PageRequest, SortDir, SortRequest};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::{
    Application, ApplicationSubtype, ApplicationType, NewUser, User,
};

/// REST DTO for application representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub creator_id: Uuid,
    pub updated_at: DateTime<Utc>,
    /// One of `created`, `inprogress`, `done`.
    #[schema(example = "created")]
    pub status: String,
    #[serde(rename = "type")]
    pub type_id: Uuid,
    #[serde(rename = "subtype")]
    pub subtype_id: Uuid,
    pub text: String,
    pub photo_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer_id: Option<Uuid>,
    #[serde(rename = "performerAt", skip_serializing_if = "Option::is_none")]
    pub performer_time: Option<DateTime<Utc>>,
}

/// REST DTO for filing an application. Ids arrive as strings and are parsed by
/// the handler so malformed input gets a field-specific message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationReq {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub type_id: String,
    #[serde(default, rename = "subtype")]
    pub subtype_id: String,
    #[serde(default)]
    pub photo_ids: Option<Vec<String>>,
}

/// REST DTO for updating an application (partial)
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationReq {
    #[schema(example = "inprogress")]
    pub status: Option<String>,
    pub performer_id: Option<String>,
    pub performer_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationTypeDto {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationSubtypeDto {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub type_id: Uuid,
}

/// REST DTO for user representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
}

/// REST DTO for creating a new user
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetaTotal {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListDto {
    pub data: Vec<ApplicationDto>,
    pub meta: MetaTotal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationTypeListDto {
    pub data: Vec<ApplicationTypeDto>,
    pub meta: MetaTotal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationSubtypeListDto {
    pub data: Vec<ApplicationSubtypeDto>,
    pub meta: MetaTotal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListDto {
    pub data: Vec<UserDto>,
    pub meta: MetaTotal,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

// --- query parameters ---

/// Paging window and ordering accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size; 0 or absent selects the default.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Public sort key, e.g. `date_created`.
    pub sort: Option<String>,
    pub direction: Option<SortDir>,
}

impl PageQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }

    pub fn sort(&self) -> Option<SortRequest> {
        self.sort
            .as_ref()
            .map(|key| SortRequest::new(key.clone(), self.direction.unwrap_or_default()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApplicationFilterQuery {
    pub performer_id: Option<String>,
    pub creator_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubtypeFilterQuery {
    #[serde(rename = "type")]
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterQuery {
    pub id: Option<String>,
    pub role: Option<String>,
}

// Conversion implementations between REST DTOs and contract models

impl From<Application> for ApplicationDto {
    fn from(a: Application) -> Self {
        Self {
            id: a.id,
            created_at: a.created_at,
            creator_id: a.creator_id,
            updated_at: a.updated_at,
            status: a.status.as_str().to_string(),
            type_id: a.type_id,
            subtype_id: a.subtype_id,
            text: a.text,
            photo_ids: a.photo_ids,
            performer_id: a.performer_id,
            performer_time: a.performer_time,
        }
    }
}

impl From<ApplicationType> for ApplicationTypeDto {
    fn from(t: ApplicationType) -> Self {
        Self {
            id: t.id,
            title: t.title,
        }
    }
}

impl From<ApplicationSubtype> for ApplicationSubtypeDto {
    fn from(s: ApplicationSubtype) -> Self {
        Self {
            id: s.id,
            title: s.title,
            type_id: s.type_id,
        }
    }
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            created_at: u.created_at,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            role: u.role,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role,
            phone: req.phone,
        }
    }
}
