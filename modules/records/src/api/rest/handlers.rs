use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::rest::auth::Identity;
use crate::api::rest::dto::{
    ApplicationDto, ApplicationFilterQuery, ApplicationListDto, ApplicationSubtypeDto,
    ApplicationSubtypeListDto, ApplicationTypeDto, ApplicationTypeListDto, CreateApplicationReq,
    CreateUserReq, ErrorBody, MetaTotal, PageQuery, SubtypeFilterQuery, UpdateApplicationReq,
    UserDto, UserFilterQuery, UserListDto,
};
use crate::api::rest::error::{ApiError, ApiJson, ApiPath, ApiQuery};
use crate::contract::model::{
    ApplicationFilter, ApplicationPatch, ApplicationStatus, NewApplication, SubtypeFilter,
    UserFilter,
};
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Token for one request. The guard cancels it when dropped, which happens when
/// the handler returns or when its future is abandoned (client gone, timeout).
fn request_cancel() -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw.trim()).map_err(|_| DomainError::validation(field, "must be a uuid"))
}

fn parse_opt_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, DomainError> {
    raw.map(|r| parse_id(field, r)).transpose()
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, DomainError> {
    raw.parse()
        .map_err(|_| DomainError::validation("status", "must be one of created, inprogress, done"))
}

fn new_application(
    creator_id: Uuid,
    req: CreateApplicationReq,
) -> Result<NewApplication, DomainError> {
    if req.text.trim().is_empty() {
        return Err(DomainError::validation("text", "must not be empty"));
    }
    if req.type_id.trim().is_empty() {
        return Err(DomainError::validation("type", "must not be empty"));
    }
    let type_id = parse_id("type", &req.type_id)?;
    let subtype_id = parse_id("subtype", &req.subtype_id)?;
    let photo_ids = req
        .photo_ids
        .unwrap_or_default()
        .iter()
        .map(|p| parse_id("photoIds", p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NewApplication {
        creator_id,
        type_id,
        subtype_id,
        text: req.text,
        photo_ids,
    })
}

fn application_patch(req: UpdateApplicationReq) -> Result<ApplicationPatch, DomainError> {
    Ok(ApplicationPatch {
        status: req.status.as_deref().map(parse_status).transpose()?,
        performer_id: parse_opt_id("performerId", req.performer_id.as_deref())?,
        performer_time: req.performer_time,
    })
}

fn application_filter(q: &ApplicationFilterQuery) -> Result<ApplicationFilter, DomainError> {
    Ok(ApplicationFilter {
        performer_id: parse_opt_id("performer_id", q.performer_id.as_deref())?,
        creator_id: parse_opt_id("creator_id", q.creator_id.as_deref())?,
        status: q.status.as_deref().map(parse_status).transpose()?,
        type_id: parse_opt_id("type", q.type_id.as_deref())?,
    })
}

// --- applications ---

/// File a new application on behalf of the session user
#[utoipa::path(
    post,
    path = "/applications",
    tag = "applications",
    request_body = CreateApplicationReq,
    responses(
        (status = 201, description = "Created application", body = ApplicationDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn create_application(
    Extension(svc): Extension<Arc<Service>>,
    Identity(creator_id): Identity,
    ApiJson(req): ApiJson<CreateApplicationReq>,
) -> Result<(StatusCode, Json<ApplicationDto>), ApiError> {
    info!(%creator_id, "Creating application");
    let new_app = new_application(creator_id, req)?;
    let (cancel, _guard) = request_cancel();
    let app = svc.create_application(new_app, &cancel).await?;
    Ok((StatusCode::CREATED, Json(app.into())))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application found", body = ApplicationDto),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn get_application(
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let (cancel, _guard) = request_cancel();
    let app = svc.get_application(id, &cancel).await?;
    Ok(Json(app.into()))
}

#[utoipa::path(
    get,
    path = "/applications",
    tag = "applications",
    params(ApplicationFilterQuery, PageQuery),
    responses(
        (status = 200, description = "Page of applications", body = ApplicationListDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn list_applications(
    Extension(svc): Extension<Arc<Service>>,
    ApiQuery(filter): ApiQuery<ApplicationFilterQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<ApplicationListDto>, ApiError> {
    debug!(?filter, ?page, "Listing applications");
    let filter = application_filter(&filter)?;
    let sort = page.sort();
    let (cancel, _guard) = request_cancel();
    let res = svc
        .list_applications(filter, &page.page(), sort.as_ref(), &cancel)
        .await?;
    Ok(Json(ApplicationListDto {
        meta: MetaTotal { total: res.total },
        data: res.items.into_iter().map(ApplicationDto::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/applications/{id}",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = UpdateApplicationReq,
    responses(
        (status = 200, description = "Updated application", body = ApplicationDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn update_application(
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateApplicationReq>,
) -> Result<Json<ApplicationDto>, ApiError> {
    info!(application_id = %id, "Updating application");
    let patch = application_patch(req)?;
    let (cancel, _guard) = request_cancel();
    let app = svc.update_application(id, patch, &cancel).await?;
    Ok(Json(app.into()))
}

// --- catalog ---

#[utoipa::path(
    get,
    path = "/application-types",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of application types", body = ApplicationTypeListDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn list_application_types(
    Extension(svc): Extension<Arc<Service>>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<ApplicationTypeListDto>, ApiError> {
    let sort = page.sort();
    let (cancel, _guard) = request_cancel();
    let res = svc
        .list_application_types(&page.page(), sort.as_ref(), &cancel)
        .await?;
    Ok(Json(ApplicationTypeListDto {
        meta: MetaTotal { total: res.total },
        data: res.items.into_iter().map(ApplicationTypeDto::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/application-subtypes",
    tag = "catalog",
    params(SubtypeFilterQuery, PageQuery),
    responses(
        (status = 200, description = "Page of application subtypes", body = ApplicationSubtypeListDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn list_application_subtypes(
    Extension(svc): Extension<Arc<Service>>,
    ApiQuery(filter): ApiQuery<SubtypeFilterQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<ApplicationSubtypeListDto>, ApiError> {
    let filter = SubtypeFilter {
        type_id: parse_opt_id("type", filter.type_id.as_deref())?,
    };
    let sort = page.sort();
    let (cancel, _guard) = request_cancel();
    let res = svc
        .list_application_subtypes(filter, &page.page(), sort.as_ref(), &cancel)
        .await?;
    Ok(Json(ApplicationSubtypeListDto {
        meta: MetaTotal { total: res.total },
        data: res
            .items
            .into_iter()
            .map(ApplicationSubtypeDto::from)
            .collect(),
    }))
}

// --- users ---

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Created user", body = UserDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    ApiJson(req): ApiJson<CreateUserReq>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    info!("Creating user");
    let (cancel, _guard) = request_cancel();
    let user = svc.create_user(req.into(), &cancel).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let (cancel, _guard) = request_cancel();
    let user = svc.get_user(id, &cancel).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(UserFilterQuery, PageQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListDto),
        (status = 400, description = "Bad Request", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
    ApiQuery(filter): ApiQuery<UserFilterQuery>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<UserListDto>, ApiError> {
    let filter = UserFilter {
        id: parse_opt_id("id", filter.id.as_deref())?,
        role: filter.role,
    };
    let sort = page.sort();
    let (cancel, _guard) = request_cancel();
    let res = svc
        .list_users(filter, &page.page(), sort.as_ref(), &cancel)
        .await?;
    Ok(Json(UserListDto {
        meta: MetaTotal { total: res.total },
        data: res.items.into_iter().map(UserDto::from).collect(),
    }))
}

/// Soft-delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Internal Server Error", body = ErrorBody)
    )
)]
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    info!(user_id = %id, "Deleting user");
    let (cancel, _guard) = request_cancel();
    svc.delete_user(id, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_is_validated_field_by_field() {
        let creator = Uuid::new_v4();
        let good = CreateApplicationReq {
            text: "broken lift".into(),
            type_id: Uuid::new_v4().to_string(),
            subtype_id: Uuid::new_v4().to_string(),
            photo_ids: Some(vec![Uuid::new_v4().to_string()]),
        };
        let app = new_application(creator, good.clone()).unwrap();
        assert_eq!(app.creator_id, creator);
        assert_eq!(app.photo_ids.len(), 1);

        let no_text = CreateApplicationReq {
            text: "  ".into(),
            ..good.clone()
        };
        assert!(matches!(
            new_application(creator, no_text),
            Err(DomainError::Validation { field, .. }) if field == "text"
        ));

        let bad_subtype = CreateApplicationReq {
            subtype_id: "nope".into(),
            ..good.clone()
        };
        assert!(matches!(
            new_application(creator, bad_subtype),
            Err(DomainError::Validation { field, .. }) if field == "subtype"
        ));

        let bad_photo = CreateApplicationReq {
            photo_ids: Some(vec!["x".into()]),
            ..good
        };
        assert!(matches!(
            new_application(creator, bad_photo),
            Err(DomainError::Validation { field, .. }) if field == "photoIds"
        ));
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        let q = ApplicationFilterQuery {
            status: Some("archived".into()),
            ..Default::default()
        };
        assert!(application_filter(&q).is_err());
    }

    #[test]
    fn empty_update_body_gives_empty_patch() {
        let patch = application_patch(UpdateApplicationReq::default()).unwrap();
        assert!(patch.is_empty());
    }
}
