//! `gatehouse-core`: shared building blocks (identifiers and the error taxonomy).
//!
//! This crate contains no IO and no transport concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{AppError, AppResult, ErrorKind};
pub use id::{PermissionId, RoleId, UserId};
