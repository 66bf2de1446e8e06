//! Request middleware.

pub mod auth;
pub mod debug;
pub mod meta;
