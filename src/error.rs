use std::fmt;

/// Which half of the two-step login failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    TokenGrant,
    Login,
}

#[derive(Debug)]
pub enum Error {
    Authentication { stage: AuthStage, message: String },
    Vendor { code: i64, message: String },
    Transport { status: Option<u16>, message: String },
    Json(serde_json::Error),
    Io(std::io::Error),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication { stage: AuthStage::TokenGrant, message } => {
                write!(f, "token request failed: {message}")
            }
            Error::Authentication { stage: AuthStage::Login, message } => {
                write!(f, "authentication failed: {message}")
            }
            Error::Vendor { code, message } => write!(f, "Tuya API error: {code} - {message}"),
            Error::Transport { status: Some(status), message } => {
                write!(f, "Tuya API request failed: [{status}] {message}")
            }
            Error::Transport { status: None, message } => {
                write!(f, "Tuya API request failed: [unknown] {message}")
            }
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_stages_render_distinct_messages() {
        let grant = Error::Authentication {
            stage: AuthStage::TokenGrant,
            message: "Invalid credentials".into(),
        };
        let login = Error::Authentication {
            stage: AuthStage::Login,
            message: "User not found".into(),
        };
        assert_eq!(grant.to_string(), "token request failed: Invalid credentials");
        assert_eq!(login.to_string(), "authentication failed: User not found");
    }

    #[test]
    fn transport_without_status_is_unknown() {
        let err = Error::Transport { status: None, message: "connection refused".into() };
        assert_eq!(err.to_string(), "Tuya API request failed: [unknown] connection refused");
    }
}
