//! Route paths.

pub const GET_TESTING_PING: &str = "/v0/testing/ping";
pub const POST_TESTING_ECHO: &str = "/v0/testing/echo";
pub const POST_AUTH_LOGIN: &str = "/v0/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/v0/api/auth/refresh";
pub const POST_AUTH_VALIDATE: &str = "/v0/api/auth/validate";
pub const POST_AUTH_LOGOUT: &str = "/v0/api/auth/logout";
pub const POST_AUTH_REVOKE_ALL: &str = "/v0/api/auth/revokeAll";
