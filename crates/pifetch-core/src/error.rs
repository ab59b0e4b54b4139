//! Error types shared by every pifetch crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// The hardware identifier is not six hex pairs.
    InvalidAddressFormat,
    /// A cached address was given without the secret needed to verify it.
    MissingPrivilegedCredential,
    /// The full subnet scan found no device with the identifier.
    AddressNotFound,
    /// The device rejected the login credentials.
    AuthenticationError,
    /// The device could not be reached or the session broke.
    ConnectionError,
    /// The remote path does not exist on the device.
    RemoteFileNotFound,
    /// The local destination could not be written.
    LocalWriteError,
    /// A blocking step ran past its timeout.
    Timeout,
    /// The sweep or neighbor-table utility could not be run.
    DiscoveryToolError,
    /// The configuration file is unreadable or invalid.
    ConfigError,
    Internal,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    pub fn new(kind: FetchErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is(&self, kind: FetchErrorKind) -> bool {
        self.kind == kind
    }

    pub fn invalid_address(candidate: &str) -> Self {
        Self::new(
            FetchErrorKind::InvalidAddressFormat,
            format!("The MAC address '{}' is not valid", candidate),
        )
    }

    pub fn missing_privileged_credential(cached: impl fmt::Display) -> Self {
        Self::new(
            FetchErrorKind::MissingPrivilegedCredential,
            format!(
                "Verifying the cached address {} requires the local privileged password",
                cached
            ),
        )
    }

    pub fn address_not_found(identity: impl fmt::Display) -> Self {
        Self::new(
            FetchErrorKind::AddressNotFound,
            format!("IP address not found for MAC address {}", identity),
        )
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::AuthenticationError, msg)
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ConnectionError, msg)
    }

    pub fn remote_not_found(path: impl fmt::Display) -> Self {
        Self::new(
            FetchErrorKind::RemoteFileNotFound,
            format!("Remote file '{}' does not exist", path),
        )
    }

    pub fn local_write(path: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::new(
            FetchErrorKind::LocalWriteError,
            format!("Cannot write local file '{}'", path),
        )
        .with_detail(err.to_string())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, msg)
    }

    pub fn discovery_tool(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::DiscoveryToolError, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ConfigError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Internal, msg)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::config("Invalid configuration").with_detail(e.to_string())
    }
}

impl From<FetchError> for String {
    fn from(e: FetchError) -> String {
        e.to_string()
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
