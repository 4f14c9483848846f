pub mod application;
pub mod application_subtype;
pub mod application_type;
pub mod user;
