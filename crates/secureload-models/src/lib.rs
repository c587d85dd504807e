//! # SecureLoad Models
//!
//! Data structures shared across the SecureLoad crates: persisted entities
//! of the local identity mirror, request/response DTOs, and the payloads
//! exchanged with the authorization server.
//!
//! # Modules
//!
//! - [`auth`]: credentials and token pairs
//! - [`users`]: local users, upstream profiles and user DTOs
//! - [`roles`]: groups (roles) and permissions

pub mod auth;
pub mod roles;
pub mod users;

pub use auth::{Credentials, DetailResponse, LoginRequest, RefreshTokenRequest, TokenPair};
pub use roles::{
    CreateGroupDto, CreatePermissionDto, Group, GroupWithPermissions, Permission, UpdateGroupDto,
};
pub use users::{
    CreateUserDto, LocalUser, NewLocalUser, NewRemoteUser, UpdateProfileDto, UpdateUserDto,
    UserChanges, UserDetail, UserExistsRequest, UserProfile,
};
