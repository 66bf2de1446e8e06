//! Wire types for the `/v0` API. All fields are camelCase on the wire.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::VersionInfo;

/// Version block attached to every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub api_version: String,
    pub min_api_version: String,
    pub build_version: String,
    pub timestamp: i64,
    pub release_date: String,
    pub deprecated: bool,
    pub deprecated_message: String,
}

impl Meta {
    /// Meta stamped with the current time.
    pub fn new(versions: &VersionInfo) -> Self {
        Self {
            api_version: versions.api_version.clone(),
            min_api_version: versions.min_api_version.clone(),
            build_version: versions.build_version.clone(),
            timestamp: Utc::now().timestamp(),
            release_date: versions.release_date.clone(),
            deprecated: false,
            deprecated_message: String::new(),
        }
    }
}

/// One entry of the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// `ForClientError` or `ForServerError`.
    pub error: String,
    pub error_type: String,
    pub error_message: String,
}

impl ErrorInfo {
    pub fn new(error_type: &str, error_message: &str) -> Self {
        let class = match error_type {
            "InvalidRequest" | "NotFound" | "Unauthorized" => "ForClientError",
            _ => "ForServerError",
        };
        Self {
            error: class.to_string(),
            error_type: error_type.to_string(),
            error_message: error_message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorInfo>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub language: String,
}

/// Login payload. Either `username`/`password` or
/// `identifier`/`timestamp`/`signature` is expected to be filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthInfo {
    pub username: String,
    pub password: String,
    pub identifier: String,
    pub timestamp: i64,
    pub signature: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub auth: AuthInfo,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateRequest {
    pub access_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutInfo {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutRequest {
    pub logout: LogoutInfo,
}

/// Result of a bulk revoke for the authenticated subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAllResponse {
    pub revoked: u64,
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
    pub status: String,
    pub meta: Meta,
}

/// Body of `POST /v0/testing/echo`: the request JSON handed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoResponse {
    pub echo: serde_json::Value,
    /// Subject of a valid bearer token, when one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub meta: Meta,
}
