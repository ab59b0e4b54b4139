//! # pifetch – core
//!
//! Types shared by the discovery and transfer crates:
//!   • `FetchError` / `FetchErrorKind` and the `FetchResult` alias
//!   • `DeviceIdentity`, the validated hardware address
//!   • `Credentials` for the device login and local privileged probing
//!   • `TransferSpec` for a single remote-to-local copy
//!   • `PiFetchConfig`, the JSON configuration file

pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod transfer;

pub use config::*;
pub use credentials::Credentials;
pub use error::{FetchError, FetchErrorKind, FetchResult};
pub use identity::{validate_hardware_address, DeviceIdentity};
pub use transfer::TransferSpec;
