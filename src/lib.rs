//! # pifetch
//!
//! Finds a device on the local network by its MAC address and copies one
//! file off it over SFTP.
//!
//! ```text
//!   validate ──► resolve (cached probe │ subnet scan) ──► SSH login ──► SFTP copy
//! ```
//!
//! The building blocks live in the workspace crates and are re-exported here:
//!   • `pifetch-core`      – errors, identity, credentials, config
//!   • `pifetch-discovery` – `DeviceLocator` and the `DiscoveryTools` boundary
//!   • `pifetch-ssh`       – `SecureSession` and `fetch_file`

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

pub use pifetch_core::*;
pub use pifetch_discovery::{
    DeviceLocator, DiscoveryTools, LocatorPhase, Resolution, ResolutionSource, ResolutionState,
    SystemTools, DEFAULT_SUBNET,
};
pub use pifetch_ssh::{
    fetch_file, FetchOutcome, RemoteFileSource, SecureSession, SessionConnector, SshConnector,
    TransferSession,
};

// ── Report ───────────────────────────────────────────────────────────────────

/// What a successful [`DeviceFetcher::fetch`] did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
    #[serde(skip)]
    pub resolution: Resolution,
    pub mac_address: String,
    pub address: Ipv4Addr,
    pub resolved_by: &'static str,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl FetchReport {
    fn new(
        resolution: Resolution,
        spec: &TransferSpec,
        outcome: FetchOutcome,
        started_at: DateTime<Utc>,
    ) -> Self {
        let resolved_by = match resolution.source {
            ResolutionSource::CachedProbe => "cachedProbe",
            ResolutionSource::SubnetScan => "subnetScan",
        };
        Self {
            mac_address: resolution.identity.to_string(),
            address: resolution.address,
            resolved_by,
            remote_path: spec.remote_path.clone(),
            local_path: outcome.local_path,
            bytes: outcome.bytes,
            sha256: outcome.sha256,
            started_at,
            elapsed_ms: (Utc::now() - started_at).num_milliseconds(),
            resolution,
        }
    }
}

// ── Fetcher ──────────────────────────────────────────────────────────────────

/// Locate the device, log in, copy the file. One attempt per call.
pub struct DeviceFetcher<T, C> {
    locator: DeviceLocator<T>,
    connector: Arc<C>,
    credentials: Arc<Credentials>,
}

impl DeviceFetcher<SystemTools, SshConnector> {
    /// Fetcher wired to the host's discovery tools and a real SSH connector.
    pub fn from_config(config: &PiFetchConfig, credentials: Credentials) -> FetchResult<Self> {
        let mac = config.device.mac_address.as_deref().ok_or_else(|| {
            FetchError::config("No MAC address given (--mac or device.macAddress)")
        })?;
        let locator = DeviceLocator::new(
            mac,
            config.device.cached_address,
            Arc::new(credentials),
            SystemTools::new(config.discovery.clone()),
        )?
        .with_subnet(config.discovery.subnet.clone());
        Ok(Self::new(locator, SshConnector::new(config.session.clone())))
    }
}

impl<T, C> DeviceFetcher<T, C>
where
    T: DiscoveryTools,
    C: SessionConnector,
{
    /// Logs in with the credentials the locator was built with.
    pub fn new(locator: DeviceLocator<T>, connector: C) -> Self {
        let credentials = locator.credentials().clone();
        Self {
            locator,
            connector: Arc::new(connector),
            credentials,
        }
    }

    pub fn locator(&self) -> &DeviceLocator<T> {
        &self.locator
    }

    /// Run the whole pipeline for `spec`.
    pub async fn fetch(&self, spec: &TransferSpec) -> FetchResult<FetchReport> {
        let started_at = Utc::now();
        let resolution = self.locator.locate().await?;
        let outcome = self.download(resolution.address, spec.clone()).await?;
        let report = FetchReport::new(resolution, spec, outcome, started_at);
        info!(
            "Fetched '{}' from {} in {} ms",
            report.remote_path, report.address, report.elapsed_ms
        );
        Ok(report)
    }

    /// Blocking SSH work runs on the blocking pool. Session and channel are
    /// dropped there, channel first, whatever the outcome.
    async fn download(&self, address: Ipv4Addr, spec: TransferSpec) -> FetchResult<FetchOutcome> {
        let connector = self.connector.clone();
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || {
            let session = connector.connect(IpAddr::V4(address), &credentials)?;
            let channel = session.open_channel()?;
            fetch_file(&channel, &spec)
        })
        .await
        .map_err(|e| FetchError::internal("Transfer task failed").with_detail(e.to_string()))?
    }
}
