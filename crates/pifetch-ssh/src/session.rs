// ── SecureSession – authenticated SSH session to the resolved device ────────

use crate::fetch::RemoteFileSource;
use log::{debug, info, warn};
use pifetch_core::{Credentials, FetchError, FetchResult, SessionConfig};
use ssh2::{CheckResult, KnownHostFileKind, Session, Sftp};
use std::io::Read;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::path::Path;

// libssh2 error codes surfaced through `ssh2::ErrorCode`.
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;
const LIBSSH2_FX_NO_SUCH_FILE: i32 = 2;
const LIBSSH2_FX_NO_SUCH_PATH: i32 = 10;

// ── Seams used by the download pipeline ──────────────────────────────────────

/// Opens a [`TransferSession`] to a device.
pub trait SessionConnector: Send + Sync + 'static {
    type Session: TransferSession;

    fn connect(&self, address: IpAddr, credentials: &Credentials) -> FetchResult<Self::Session>;
}

/// An open session able to hand out file-transfer channels.
pub trait TransferSession {
    type Channel: RemoteFileSource;

    fn open_channel(&self) -> FetchResult<Self::Channel>;
}

/// [`SessionConnector`] over real SSH.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SessionConfig,
}

impl SshConnector {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl SessionConnector for SshConnector {
    type Session = SecureSession;

    fn connect(&self, address: IpAddr, credentials: &Credentials) -> FetchResult<SecureSession> {
        SecureSession::open(address, credentials, &self.config)
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Disconnects when dropped.
pub struct SecureSession {
    session: Session,
    address: SocketAddr,
    fingerprint: Option<String>,
}

impl SecureSession {
    /// Connect, accept the host key, and log in with the device password.
    pub fn open(
        address: IpAddr,
        credentials: &Credentials,
        config: &SessionConfig,
    ) -> FetchResult<Self> {
        let addr = SocketAddr::new(address, config.port);
        info!("SSH connecting to {}", addr);

        let tcp = TcpStream::connect_timeout(&addr, config.timeout()).map_err(|e| {
            let err = if e.kind() == std::io::ErrorKind::TimedOut {
                FetchError::timeout(format!("TCP connection to {} timed out", addr))
            } else {
                FetchError::connection(format!("TCP connection to {} failed", addr))
            };
            err.with_detail(e.to_string())
        })?;

        let mut session = Session::new().map_err(|e| {
            FetchError::connection("Failed to create SSH session").with_detail(e.to_string())
        })?;
        session.set_timeout(config.timeout().as_millis().min(u32::MAX as u128) as u32);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| ssh_error(&e, format!("SSH handshake with {} failed", addr)))?;

        if let Some(banner) = session.banner() {
            debug!("Server banner from {}: {}", addr, banner);
        }

        let fingerprint = session.host_key_hash(ssh2::HashType::Sha256).map(|bytes| {
            let encoded =
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
            format!("SHA256:{}", encoded)
        });

        accept_host_key(&session, &addr, config.known_hosts_path.as_deref())?;

        session
            .userauth_password(&credentials.username, credentials.password())
            .map_err(|e| {
                ssh_error(
                    &e,
                    format!("Login as '{}' on {} failed", credentials.username, addr),
                )
            })?;

        if !session.authenticated() {
            return Err(FetchError::authentication(format!(
                "'{}' is not authenticated on {} after password login",
                credentials.username, addr
            )));
        }

        info!("SSH authenticated to {} as {}", addr, credentials.username);
        Ok(Self {
            session,
            address: addr,
            fingerprint,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// `SHA256:<base64>` of the host key the server presented.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Start the SFTP subsystem. The channel closes when dropped.
    pub fn open_sftp(&self) -> FetchResult<SftpChannel> {
        let sftp = self
            .session
            .sftp()
            .map_err(|e| ssh_error(&e, format!("Failed to open SFTP channel on {}", self.address)))?;
        Ok(SftpChannel {
            sftp,
            address: self.address,
        })
    }
}

impl TransferSession for SecureSession {
    type Channel = SftpChannel;

    fn open_channel(&self) -> FetchResult<SftpChannel> {
        self.open_sftp()
    }
}

impl Drop for SecureSession {
    fn drop(&mut self) {
        debug!("SSH disconnecting from {}", self.address);
        let _ = self
            .session
            .disconnect(None, "Client disconnecting", None);
    }
}

// ── SFTP channel ─────────────────────────────────────────────────────────────

pub struct SftpChannel {
    sftp: Sftp,
    address: SocketAddr,
}

impl RemoteFileSource for SftpChannel {
    fn open_remote(&self, path: &str) -> FetchResult<Box<dyn Read + '_>> {
        match self.sftp.open(Path::new(path)) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) => match e.code() {
                ssh2::ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_FILE)
                | ssh2::ErrorCode::SFTP(LIBSSH2_FX_NO_SUCH_PATH) => {
                    Err(FetchError::remote_not_found(path).with_detail(self.address.to_string()))
                }
                _ => Err(ssh_error(
                    &e,
                    format!("Failed to open remote '{}' on {}", path, self.address),
                )),
            },
        }
    }
}

// ── Host key policy ──────────────────────────────────────────────────────────

/// Accept whatever key the server presents and remember it.
///
/// There is no out-of-band verification: the device lives on a trusted
/// private network and changes address, so a key seen at a new address (or a
/// new key at a known address) is logged and accepted.
fn accept_host_key(
    session: &Session,
    addr: &SocketAddr,
    known_hosts_path: Option<&Path>,
) -> FetchResult<()> {
    let (key, key_type) = session
        .host_key()
        .ok_or_else(|| FetchError::connection(format!("{} presented no host key", addr)))?;

    let mut known = session.known_hosts().map_err(|e| {
        FetchError::internal("Failed to initialise known hosts").with_detail(e.to_string())
    })?;

    if let Some(path) = known_hosts_path {
        if path.exists() {
            if let Err(e) = known.read_file(path, KnownHostFileKind::OpenSSH) {
                warn!("Ignoring unreadable known_hosts '{}': {}", path.display(), e);
            }
        }
    }

    let host = known_hosts_name(addr);
    match known.check_port(&addr.ip().to_string(), addr.port(), key) {
        CheckResult::Match => {
            debug!("Host key for {} already known", host);
            return Ok(());
        }
        CheckResult::Mismatch => {
            warn!("Host key for {} changed; accepting the new key", host);
            if let Ok(entries) = known.iter() {
                for entry in entries.iter().filter(|h| h.name() == Some(host.as_str())) {
                    let _ = known.remove(entry);
                }
            }
        }
        CheckResult::NotFound => info!("Recording new host key for {}", host),
        CheckResult::Failure => warn!("Host key check for {} failed; accepting the key", host),
    }

    known
        .add(&host, key, "added by pifetch", key_type.into())
        .map_err(|e| {
            FetchError::internal(format!("Failed to record host key for {}", host))
                .with_detail(e.to_string())
        })?;

    if let Some(path) = known_hosts_path {
        if let Err(e) = known.write_file(path, KnownHostFileKind::OpenSSH) {
            warn!("Could not save host key to '{}': {}", path.display(), e);
        }
    }
    Ok(())
}

/// OpenSSH host pattern: bare address on port 22, `[address]:port` otherwise.
pub fn known_hosts_name(addr: &SocketAddr) -> String {
    if addr.port() == 22 {
        addr.ip().to_string()
    } else {
        format!("[{}]:{}", addr.ip(), addr.port())
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

fn ssh_error(e: &ssh2::Error, msg: String) -> FetchError {
    let err = match e.code() {
        ssh2::ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) => FetchError::timeout(msg),
        ssh2::ErrorCode::Session(LIBSSH2_ERROR_AUTHENTICATION_FAILED) => {
            FetchError::authentication(msg)
        }
        _ => FetchError::connection(msg),
    };
    err.with_detail(e.to_string())
}
