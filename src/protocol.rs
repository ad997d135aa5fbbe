use std::borrow::Cow;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::types::Command;

pub const TOKEN_GRANT_PATH: &str = "/v1.0/token?grant_type=1";
pub const LOGIN_PATH: &str = "/v1.0/iot-01/associated-users/actions/authorized-login";
pub const SIGN_METHOD: &str = "HMAC-SHA256";
pub const LOGIN_SCHEMA: &str = "smartlife";

const REFRESH_PREFIX: &str = "/v1.0/token/";

pub fn refresh_path(refresh_token: &str) -> String {
    format!("{REFRESH_PREFIX}{refresh_token}")
}

/// Masks the refresh token carried in a refresh path; other paths pass
/// through untouched.
pub fn redact_path(path: &str) -> Cow<'_, str> {
    match path.strip_prefix(REFRESH_PREFIX) {
        Some(token) if !token.is_empty() => Cow::Owned(format!("{REFRESH_PREFIX}***")),
        _ => Cow::Borrowed(path),
    }
}

pub fn status_path(device_id: &str) -> String {
    format!("/v1.0/devices/{device_id}/status")
}

pub fn commands_path(device_id: &str) -> String {
    format!("/v1.0/devices/{device_id}/commands")
}

/// Uniform response wrapper. `result` is absent on most failures.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub result: Option<T>,
    #[serde(default)]
    #[allow(dead_code)]
    pub t: i64,
    #[serde(default)]
    #[allow(dead_code)]
    pub tid: String,
}

/// `result` of the token grant, login and refresh calls.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expire_time: i64,
    #[serde(default)]
    pub uid: String,
}

pub fn login_body(username: &str, password_md5: &str, country_code: u32) -> Value {
    json!({
        "username": username,
        "password": password_md5,
        "country_code": country_code.to_string(),
        "schema": LOGIN_SCHEMA,
    })
}

pub fn commands_body(commands: &[Command]) -> Value {
    json!({ "commands": commands })
}

pub fn md5_hex(input: &str) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Request body string: empty unless there is a non-empty object to send.
pub fn body_string(body: Option<&Value>) -> String {
    match body {
        None => String::new(),
        Some(Value::Object(map)) if map.is_empty() => String::new(),
        Some(Value::Null) => String::new(),
        Some(v) => v.to_string(),
    }
}
