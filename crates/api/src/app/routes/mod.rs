pub mod admin;
pub mod auth;
pub mod system;
pub mod users;
