pub mod entity;
pub mod filters;
pub mod mapper;
pub mod schema;
pub mod sea_orm_repo;
