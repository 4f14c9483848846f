//! Translate domain filters and patches into SeaORM conditions and active models.
//!
//! Each filter folds its present fields into one AND of equality predicates; an
//! empty filter yields an empty condition, which matches every row.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition};

use crate::contract::model::{ApplicationFilter, ApplicationPatch, SubtypeFilter, UserFilter};
use crate::infra::storage::entity::{application, application_subtype, user};

fn all_of(predicates: impl IntoIterator<Item = Option<SimpleExpr>>) -> Condition {
    predicates
        .into_iter()
        .flatten()
        .fold(Condition::all(), |cond, p| cond.add(p))
}

pub fn application_condition(f: &ApplicationFilter) -> Condition {
    all_of([
        f.performer_id
            .map(|v| application::Column::PerformerId.eq(v)),
        f.creator_id.map(|v| application::Column::CreatorId.eq(v)),
        f.status
            .map(|s| application::Column::Status.eq(s.as_str())),
        f.type_id.map(|v| application::Column::TypeId.eq(v)),
    ])
}

pub fn subtype_condition(f: &SubtypeFilter) -> Condition {
    all_of([f.type_id.map(|v| application_subtype::Column::TypeId.eq(v))])
}

/// Live users only, narrowed by the optional filters.
pub fn user_condition(f: &UserFilter) -> Condition {
    all_of([
        Some(user::Column::DeletedAt.is_null()),
        f.id.map(|v| user::Column::Id.eq(v)),
        f.role.as_deref().map(|v| user::Column::Role.eq(v)),
    ])
}

/// The SET list for an application update, or `None` if the patch is empty.
/// `updated_at` is always written alongside the patched fields.
pub fn application_update(
    patch: &ApplicationPatch,
    updated_at: DateTime<Utc>,
) -> Option<application::ActiveModel> {
    if patch.is_empty() {
        return None;
    }
    let mut am = application::ActiveModel {
        updated_at: Set(updated_at),
        ..Default::default()
    };
    if let Some(status) = patch.status {
        am.status = Set(status.as_str().to_string());
    }
    if let Some(performer_id) = patch.performer_id {
        am.performer_id = Set(Some(performer_id));
    }
    if let Some(performer_time) = patch.performer_time {
        am.performer_time = Set(Some(performer_time));
    }
    Some(am)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::ApplicationStatus;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use uuid::Uuid;

    fn where_clause(cond: Condition) -> String {
        let sql = application::Entity::find()
            .filter(cond)
            .build(DbBackend::Postgres)
            .to_string();
        sql.split_once("WHERE")
            .map(|(_, w)| w.trim().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(where_clause(application_condition(&ApplicationFilter::default())), "");
    }

    #[test]
    fn present_fields_are_and_ed() {
        let creator = Uuid::new_v4();
        let sql = where_clause(application_condition(&ApplicationFilter {
            creator_id: Some(creator),
            status: Some(ApplicationStatus::InProgress),
            ..Default::default()
        }));
        assert!(sql.contains("\"creator_id\" ="), "{sql}");
        assert!(sql.contains("\"status\" = 'inprogress'"), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
        assert!(!sql.contains("performer_id"), "{sql}");
    }

    #[test]
    fn user_condition_always_excludes_deleted() {
        let sql = user::Entity::find()
            .filter(user_condition(&UserFilter::default()))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("\"deleted_at\" IS NULL"), "{sql}");
    }

    #[test]
    fn empty_patch_has_no_set_list() {
        assert!(application_update(&ApplicationPatch::default(), Utc::now()).is_none());
    }

    #[test]
    fn patch_sets_only_present_fields() {
        let at = Utc::now();
        let am = application_update(
            &ApplicationPatch {
                status: Some(ApplicationStatus::Done),
                ..Default::default()
            },
            at,
        )
        .unwrap();
        assert_eq!(am.updated_at, Set(at));
        assert_eq!(am.status, Set("done".to_string()));
        assert!(am.performer_id.is_not_set());
        assert!(am.text.is_not_set());
    }
}
