//! # pifetch – ssh
//!
//! Authenticated SSH session to the located device and a single-file SFTP
//! download:
//!   • `session` – `SecureSession` (password auth, accept-and-record host keys)
//!     and the `SessionConnector` / `TransferSession` seams
//!   • `fetch`   – `fetch_file`, an all-or-nothing copy into the local path

pub mod fetch;
pub mod session;

pub use fetch::{fetch_file, FetchOutcome, RemoteFileSource};
pub use session::{
    known_hosts_name, SecureSession, SessionConnector, SftpChannel, SshConnector,
    TransferSession,
};
