use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::types::TempRange;
use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);

/// Tuya OpenAPI data centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Us,
    Eu,
    Cn,
    In,
}

impl Region {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Region::Us => "https://openapi.tuyaus.com",
            Region::Eu => "https://openapi.tuyaeu.com",
            Region::Cn => "https://openapi.tuyacn.com",
            Region::In => "https://openapi.tuyain.com",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "us" => Some(Region::Us),
            "eu" => Some(Region::Eu),
            "cn" => Some(Region::Cn),
            "in" => Some(Region::In),
            _ => None,
        }
    }
}

/// Cloud project and app-account credentials. The password is kept in
/// plaintext here and only its MD5 digest goes over the wire.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_id: String,
    pub access_key: String,
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub country_code: u32,
}

impl Credentials {
    pub fn new(
        access_id: impl Into<String>,
        access_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            access_id: access_id.into(),
            access_key: access_key.into(),
            endpoint: endpoint.into(),
            username: String::new(),
            password: String::new(),
            country_code: 1,
        }
    }

    pub fn user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        country_code: u32,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self.country_code = country_code;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_key", &"***")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .field("country_code", &self.country_code)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Milliseconds.
    pub poll_interval: Option<u64>,
}

impl PluginOptions {
    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessoryType {
    Thermostat,
    #[default]
    HeaterCooler,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub accessory_type: AccessoryType,
    pub heating_range: Option<TempRange>,
    pub cooling_range: Option<TempRange>,
    pub auto_range: Option<TempRange>,
}

impl DeviceConfig {
    pub fn heating_range(&self) -> TempRange {
        self.heating_range.unwrap_or(TempRange::HEATING)
    }

    pub fn cooling_range(&self) -> TempRange {
        self.cooling_range.unwrap_or(TempRange::COOLING)
    }

    pub fn auto_range(&self) -> TempRange {
        self.auto_range.unwrap_or(TempRange::AUTO)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub options: PluginOptions,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl PlatformConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: PlatformConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    fn validate(&self) -> Result<()> {
        let creds = &self.options.credentials;
        if creds.access_id.is_empty() || creds.access_key.is_empty() {
            return Err(Error::Config("accessId and accessKey are required".into()));
        }
        if creds.endpoint.is_empty() {
            return Err(Error::Config("endpoint is required".into()));
        }
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(Error::Config(format!("device {:?} has no id", device.name)));
            }
            for range in [device.heating_range, device.cooling_range, device.auto_range]
                .into_iter()
                .flatten()
            {
                if range.min > range.max {
                    return Err(Error::Config(format!(
                        "device {}: range min {} exceeds max {}",
                        device.id, range.min, range.max
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "options": {
            "accessId": "id",
            "accessKey": "key",
            "endpoint": "https://openapi.tuyaeu.com",
            "username": "user@example.com",
            "password": "secret",
            "countryCode": 49,
            "pollInterval": 15000
        },
        "devices": [
            {"id": "dev1", "name": "Pool", "accessoryType": "thermostat",
             "heatingRange": {"min": 10, "max": 40}},
            {"id": "dev2", "name": "Spa"}
        ]
    }"#;

    #[test]
    fn parses_full_config() {
        let config = PlatformConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.options.credentials.country_code, 49);
        assert_eq!(config.options.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].accessory_type, AccessoryType::Thermostat);
        assert_eq!(config.devices[0].heating_range(), TempRange { min: 10.0, max: 40.0 });
        assert_eq!(config.devices[1].accessory_type, AccessoryType::HeaterCooler);
        assert_eq!(config.devices[1].cooling_range(), TempRange::COOLING);
    }

    #[test]
    fn default_poll_interval() {
        let config = PlatformConfig::from_json_str(
            r#"{"options": {"accessId": "a", "accessKey": "k", "endpoint": "e",
                "username": "u", "password": "p", "countryCode": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.options.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn rejects_missing_access_key() {
        let err = PlatformConfig::from_json_str(
            r#"{"options": {"accessId": "a", "accessKey": "", "endpoint": "e",
                "username": "u", "password": "p", "countryCode": 1}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn rejects_inverted_range() {
        let err = PlatformConfig::from_json_str(
            r#"{"options": {"accessId": "a", "accessKey": "k", "endpoint": "e",
                "username": "u", "password": "p", "countryCode": 1},
                "devices": [{"id": "d", "name": "n", "autoRange": {"min": 30, "max": 20}}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds max"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new("id", "topsecret", "https://x").user("u", "hunter2", 1);
        let out = format!("{creds:?}");
        assert!(!out.contains("topsecret"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn region_endpoints() {
        assert_eq!(Region::from_code("EU").unwrap().endpoint(), "https://openapi.tuyaeu.com");
        assert_eq!(Region::In.endpoint(), "https://openapi.tuyain.com");
        assert!(Region::from_code("xx").is_none());
    }
}
