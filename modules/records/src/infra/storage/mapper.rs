use sea_orm::prelude::Json;
use uuid::Uuid;

use crate::contract::model::{
    Application, ApplicationStatus, ApplicationSubtype, ApplicationType, User,
};
use crate::domain::error::DomainError;
use crate::infra::storage::entity::{application, application_subtype, application_type, user};

impl TryFrom<application::Model> for Application {
    type Error = DomainError;

    fn try_from(m: application::Model) -> Result<Self, Self::Error> {
        let status = m
            .status
            .parse::<ApplicationStatus>()
            .map_err(|e| DomainError::decode(format!("application {}: {e}", m.id)))?;
        let photo_ids = match m.photo_ids {
            None | Some(Json::Null) => Vec::new(),
            Some(raw) => serde_json::from_value::<Vec<Uuid>>(raw).map_err(|e| {
                DomainError::decode(format!("application {}: photo_ids: {e}", m.id))
            })?,
        };
        Ok(Application {
            id: m.id,
            created_at: m.created_at,
            creator_id: m.creator_id,
            updated_at: m.updated_at,
            status,
            type_id: m.type_id,
            subtype_id: m.subtype_id,
            text: m.text,
            photo_ids,
            performer_id: m.performer_id,
            performer_time: m.performer_time,
        })
    }
}

/// Photo ids are stored as a JSON array of strings, or NULL when there are none.
pub fn photo_ids_to_json(ids: &[Uuid]) -> Option<Json> {
    if ids.is_empty() {
        return None;
    }
    Some(Json::Array(
        ids.iter().map(|id| Json::String(id.to_string())).collect(),
    ))
}

impl From<application_type::Model> for ApplicationType {
    fn from(m: application_type::Model) -> Self {
        ApplicationType {
            id: m.id,
            title: m.title,
        }
    }
}

impl From<application_subtype::Model> for ApplicationSubtype {
    fn from(m: application_subtype::Model) -> Self {
        ApplicationSubtype {
            id: m.id,
            title: m.title,
            type_id: m.type_id,
        }
    }
}

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        User {
            id: m.id,
            created_at: m.created_at,
            first_name: m.first_name,
            last_name: m.last_name,
            role: m.role,
            phone: m.phone,
        }
    }
}
