use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, Region};
use crate::error::AuthStage;
use crate::lease::TokenLease;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    Envelope, LOGIN_PATH, SIGN_METHOD, TOKEN_GRANT_PATH, TokenGrant, body_string, commands_body,
    commands_path, login_body, md5_hex, redact_path, refresh_path, status_path,
};
use crate::signer::{Signer, canonical_url};
use crate::types::{Command, DeviceStatus, DpValue};
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TuyaClientBuilder {
    credentials: Credentials,
    endpoint: Option<String>,
    timeout: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<PathBuf>,
}

impl TuyaClientBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            log_mode: None,
            log_path: None,
        }
    }

    /// Overrides the endpoint carried by the credentials.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    pub fn region(self, region: Region) -> Self {
        self.endpoint(region.endpoint())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<PathBuf>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TuyaClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, path)?),
            _ => None,
        };

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| self.credentials.endpoint.clone());
        if endpoint.is_empty() {
            return Err(Error::Config("endpoint is required".into()));
        }

        Ok(TuyaClient {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            signer: Signer::new(
                self.credentials.access_id.clone(),
                self.credentials.access_key.clone(),
            ),
            credentials: self.credentials,
            lease: None,
            logger,
        })
    }
}

/// Session client for the Tuya cloud OpenAPI.
///
/// Holds at most one [`TokenLease`]. Every device operation first makes sure
/// the lease exists and is more than five minutes from expiry, refreshing it
/// or logging in again as needed.
pub struct TuyaClient {
    http: reqwest::Client,
    endpoint: String,
    signer: Signer,
    credentials: Credentials,
    lease: Option<TokenLease>,
    logger: Option<MessageLogger>,
}

impl TuyaClient {
    pub fn builder(credentials: Credentials) -> TuyaClientBuilder {
        TuyaClientBuilder::new(credentials)
    }

    pub fn lease(&self) -> Option<&TokenLease> {
        self.lease.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Two-step login: a client-credential token grant, then the app-account
    /// login signed with the granted token. Replaces any existing lease.
    pub async fn authenticate(&mut self) -> Result<()> {
        info!("authenticating with Tuya API");
        match self.login().await {
            Ok(lease) => {
                self.lease = Some(lease);
                info!("authenticated with Tuya API");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "authentication failed");
                Err(e)
            }
        }
    }

    pub async fn device_status(&mut self, device_id: &str) -> Result<Vec<DeviceStatus>> {
        self.ensure_token().await?;
        self.request(Method::GET, &status_path(device_id), &[], None)
            .await
    }

    /// Best effort: failures are logged and reported as `false`.
    pub async fn send_command(
        &mut self,
        device_id: &str,
        code: &str,
        value: impl Into<DpValue>,
    ) -> bool {
        let command = Command::new(code, value);
        match self.dispatch_commands(device_id, std::slice::from_ref(&command)).await {
            Ok(()) => {
                debug!(device_id, code, value = %command.value, "command sent");
                true
            }
            Err(e) => {
                error!(device_id, code, error = %e, "failed to send command");
                false
            }
        }
    }

    /// Sends all commands in one request, preserving order. Best effort like
    /// [`send_command`](Self::send_command).
    pub async fn send_commands(&mut self, device_id: &str, commands: &[Command]) -> bool {
        match self.dispatch_commands(device_id, commands).await {
            Ok(()) => {
                debug!(device_id, count = commands.len(), "commands sent");
                true
            }
            Err(e) => {
                error!(device_id, error = %e, "failed to send commands");
                false
            }
        }
    }

    // -- Helpers --

    async fn dispatch_commands(&mut self, device_id: &str, commands: &[Command]) -> Result<()> {
        self.ensure_token().await?;
        let body = commands_body(commands);
        let _: Value = self
            .request(Method::POST, &commands_path(device_id), &[], Some(&body))
            .await?;
        Ok(())
    }

    async fn login(&mut self) -> Result<TokenLease> {
        let envelope = self
            .send_signed(Method::GET, TOKEN_GRANT_PATH, &[], None, None)
            .await?;
        let grant = auth_result(envelope, AuthStage::TokenGrant)?;

        let body = login_body(
            &self.credentials.username,
            &md5_hex(&self.credentials.password),
            self.credentials.country_code,
        );
        let envelope = self
            .send_signed(Method::POST, LOGIN_PATH, &[], Some(&body), Some(&grant.access_token))
            .await?;
        let session = auth_result(envelope, AuthStage::Login)?;

        Ok(TokenLease::from_grant(session, Utc::now()))
    }

    async fn ensure_token(&mut self) -> Result<()> {
        let path = match &self.lease {
            None => return self.authenticate().await,
            Some(lease) if !lease.needs_refresh(Utc::now()) => return Ok(()),
            Some(lease) => refresh_path(lease.refresh_token()),
        };
        info!("refreshing Tuya API token");
        match self.request::<TokenGrant>(Method::GET, &path, &[], None).await {
            Ok(grant) => {
                self.lease = Some(TokenLease::from_grant(grant, Utc::now()));
                info!("token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, re-authenticating");
                self.lease = None;
                self.authenticate().await
            }
        }
    }

    /// Signed call with the current lease's token; unwraps the envelope.
    async fn request<T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let token = self.lease.as_ref().map(|l| l.access_token().to_string());
        let envelope = self
            .send_signed(method, path, query, body, token.as_deref())
            .await?;
        let log_path = redact_path(path);

        if !envelope.success {
            error!(path = %log_path, code = envelope.code, msg = %envelope.msg, "Tuya API error");
            return Err(Error::Vendor {
                code: envelope.code,
                message: envelope.msg,
            });
        }

        let Some(result) = envelope.result else {
            error!(path = %log_path, "Tuya API response has no result");
            return Err(Error::Transport {
                status: None,
                message: "response envelope has no result".into(),
            });
        };
        decode_result(&log_path, result)
    }

    /// Sends one signed request and parses the envelope. `result` stays
    /// untyped so a failure envelope is reported by its code and message
    /// whatever shape its `result` has.
    async fn send_signed(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        access_token: Option<&str>,
    ) -> Result<Envelope<Value>> {
        let body_str = body_string(body);
        let timestamp = Utc::now().timestamp_millis().to_string();
        let sign = self
            .signer
            .sign(method.as_str(), path, query, &body_str, &timestamp, access_token);
        let url = canonical_url(path, query);
        let log_path = redact_path(&url);

        if let Some(ref mut logger) = self.logger {
            logger.log_request(method.as_str(), &url, body.filter(|_| !body_str.is_empty()));
        }

        let mut req = self
            .http
            .request(method, format!("{}{}", self.endpoint, url))
            .header("t", &timestamp)
            .header("client_id", self.signer.access_id())
            .header("sign", sign)
            .header("sign_method", SIGN_METHOD);
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            req = req.header("access_token", token);
        }
        if !body_str.is_empty() {
            req = req.header(CONTENT_TYPE, "application/json").body(body_str);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(transport_failure(&log_path, e.into(), None)),
        };
        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return Err(transport_failure(&log_path, e.into(), None)),
        };
        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(ref mut logger) = self.logger {
            logger.log_response(&url, status.as_u16(), parsed.as_ref().unwrap_or(&Value::Null));
        }

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());
            let err = Error::Transport {
                status: Some(status.as_u16()),
                message,
            };
            return Err(transport_failure(&log_path, err, Some(&text)));
        }

        debug!(path = %log_path, status = status.as_u16(), body = %text, "Tuya API response");
        serde_json::from_str(&text).map_err(|e| {
            let err = Error::Transport {
                status: Some(status.as_u16()),
                message: format!("malformed response envelope: {e}"),
            };
            transport_failure(&log_path, err, Some(&text))
        })
    }
}

fn transport_failure(url: &str, err: Error, body: Option<&str>) -> Error {
    error!(path = %url, error = %err, "Tuya API request failed");
    if let Some(body) = body.filter(|b| !b.is_empty()) {
        debug!(path = %url, body, "response data");
    }
    err
}

fn decode_result<T: DeserializeOwned>(path: &str, result: Value) -> Result<T> {
    serde_json::from_value(result).map_err(|e| {
        error!(path, error = %e, "unexpected Tuya API result");
        Error::Transport {
            status: None,
            message: format!("malformed response result: {e}"),
        }
    })
}

fn auth_result(envelope: Envelope<Value>, stage: AuthStage) -> Result<TokenGrant> {
    if !envelope.success {
        return Err(Error::Authentication {
            stage,
            message: envelope.msg,
        });
    }
    let Some(result) = envelope.result else {
        return Err(Error::Authentication {
            stage,
            message: "response has no token".into(),
        });
    };
    let path = match stage {
        AuthStage::TokenGrant => TOKEN_GRANT_PATH,
        AuthStage::Login => LOGIN_PATH,
    };
    decode_result(path, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("id", "key", "https://openapi.tuyaus.com/").user("u", "p", 1)
    }

    #[test]
    fn build_trims_endpoint_slash() {
        let client = TuyaClient::builder(credentials()).build().unwrap();
        assert_eq!(client.endpoint(), "https://openapi.tuyaus.com");
        assert!(client.lease().is_none());
    }

    #[test]
    fn region_overrides_credentials_endpoint() {
        let client = TuyaClient::builder(credentials())
            .region(Region::Eu)
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "https://openapi.tuyaeu.com");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let creds = Credentials::new("id", "key", "");
        let err = TuyaClient::builder(creds).build().err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn failed_auth_envelope_carries_vendor_message() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":false,"code":1004,"msg":"sign invalid"}"#).unwrap();
        let err = auth_result(envelope, AuthStage::TokenGrant).unwrap_err();
        assert_eq!(err.to_string(), "token request failed: sign invalid");
    }
}
