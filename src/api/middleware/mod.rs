pub mod auth;
pub mod tracking;
