use axum::Json;
use paging::SortDir;
use utoipa::OpenApi;

use crate::api::rest::dto::{
    ApplicationDto, ApplicationListDto, ApplicationSubtypeDto, ApplicationSubtypeListDto,
    ApplicationTypeDto, ApplicationTypeListDto, CreateApplicationReq, CreateUserReq, ErrorBody,
    MetaTotal, UpdateApplicationReq, UserDto, UserListDto,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Bio records API", description = "Applications, users and the application catalog"),
    paths(
        crate::api::rest::handlers::create_application,
        crate::api::rest::handlers::get_application,
        crate::api::rest::handlers::list_applications,
        crate::api::rest::handlers::update_application,
        crate::api::rest::handlers::list_application_types,
        crate::api::rest::handlers::list_application_subtypes,
        crate::api::rest::handlers::create_user,
        crate::api::rest::handlers::get_user,
        crate::api::rest::handlers::list_users,
        crate::api::rest::handlers::delete_user,
    ),
    components(
        schemas(
            ApplicationDto,
            ApplicationListDto,
            ApplicationTypeDto,
            ApplicationTypeListDto,
            ApplicationSubtypeDto,
            ApplicationSubtypeListDto,
            CreateApplicationReq,
            UpdateApplicationReq,
            UserDto,
            UserListDto,
            CreateUserReq,
            MetaTotal,
            ErrorBody,
            SortDir,
        )
    ),
    tags(
        (name = "applications", description = "Service requests filed by users"),
        (name = "catalog", description = "Application types and subtypes"),
        (name = "users"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
