//! Device locator – validate, try the cached address, fall back to a scan.
//!
//! ```text
//!   Start ──► Validated ──► Resolved
//!     │           │
//!     └───────────┴──────► Failed(kind)
//! ```
//!
//! Validation and the privileged-secret check happen when the locator is
//! built, so a malformed MAC address or an unverifiable cache is rejected
//! before any process is spawned. The locator never retries; callers that
//! want another attempt call [`DeviceLocator::locate`] again.

use crate::prober::verify_cached_address;
use crate::scanner::scan_for_address;
use crate::tools::DiscoveryTools;
use log::{debug, info};
use pifetch_core::{Credentials, DeviceIdentity, FetchError, FetchErrorKind, FetchResult};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Default sweep range when none is configured.
pub const DEFAULT_SUBNET: &str = "192.168.1.0/24";

// ── Resolution result ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The targeted probe confirmed the cached address.
    CachedProbe,
    /// The address came from a full subnet scan.
    SubnetScan,
}

/// Immutable outcome of one successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub identity: DeviceIdentity,
    pub address: Ipv4Addr,
    pub source: ResolutionSource,
}

// ── Per-attempt state ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorPhase {
    Start,
    Validated,
    Resolved(Ipv4Addr),
    Failed(FetchErrorKind),
}

impl fmt::Display for LocatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Validated => write!(f, "validated"),
            Self::Resolved(addr) => write!(f, "resolved({})", addr),
            Self::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Lives for one `locate` call and is then dropped.
#[derive(Debug, Clone)]
pub struct ResolutionState {
    identity: DeviceIdentity,
    cached_address: Option<Ipv4Addr>,
    phase: LocatorPhase,
}

impl ResolutionState {
    fn new(identity: DeviceIdentity, cached_address: Option<Ipv4Addr>) -> Self {
        Self {
            identity,
            cached_address,
            phase: LocatorPhase::Start,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn cached_address(&self) -> Option<Ipv4Addr> {
        self.cached_address
    }

    pub fn phase(&self) -> LocatorPhase {
        self.phase
    }

    pub fn resolved_address(&self) -> Option<Ipv4Addr> {
        match self.phase {
            LocatorPhase::Resolved(addr) => Some(addr),
            _ => None,
        }
    }

    fn advance(&mut self, next: LocatorPhase) {
        debug!("Locator for {}: {} -> {}", self.identity, self.phase, next);
        self.phase = next;
    }
}

// ── Locator ──────────────────────────────────────────────────────────────────

pub struct DeviceLocator<T> {
    identity: DeviceIdentity,
    cached_address: Option<Ipv4Addr>,
    credentials: Arc<Credentials>,
    subnet: String,
    tools: T,
}

impl<T: DiscoveryTools> DeviceLocator<T> {
    /// Validate `hardware_address` and check that a cached address can be
    /// verified with the given credentials.
    pub fn new(
        hardware_address: &str,
        cached_address: Option<Ipv4Addr>,
        credentials: Arc<Credentials>,
        tools: T,
    ) -> FetchResult<Self> {
        let identity = DeviceIdentity::parse(hardware_address)?;
        if let Some(addr) = cached_address {
            if !credentials.has_privileged_secret() {
                return Err(FetchError::missing_privileged_credential(addr));
            }
        }
        Ok(Self {
            identity,
            cached_address,
            credentials,
            subnet: DEFAULT_SUBNET.to_string(),
            tools,
        })
    }

    pub fn with_subnet(mut self, subnet: impl Into<String>) -> Self {
        self.subnet = subnet.into();
        self
    }

    /// Trust `address` as the cached address for later lookups, e.g. one
    /// returned by an earlier [`Resolution`].
    pub fn with_cached_address(mut self, address: Ipv4Addr) -> FetchResult<Self> {
        if !self.credentials.has_privileged_secret() {
            return Err(FetchError::missing_privileged_credential(address));
        }
        self.cached_address = Some(address);
        Ok(self)
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn cached_address(&self) -> Option<Ipv4Addr> {
        self.cached_address
    }

    /// The credentials cached-address probes run with; a caller logging in
    /// to the resolved device should use the same set.
    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    pub fn subnet(&self) -> &str {
        &self.subnet
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Fresh per-attempt state, for callers that want to observe the phases.
    pub fn begin(&self) -> ResolutionState {
        ResolutionState::new(self.identity, self.cached_address)
    }

    /// Resolve the device's current address.
    pub async fn locate(&self) -> FetchResult<Resolution> {
        let mut state = self.begin();
        self.resolve(&mut state).await
    }

    /// Drive `state` to `Resolved` or `Failed`.
    pub async fn resolve(&self, state: &mut ResolutionState) -> FetchResult<Resolution> {
        // The identity is a validated type; reaching here means it parsed.
        state.advance(LocatorPhase::Validated);

        match self.try_resolve(state).await {
            Ok(resolution) => {
                state.advance(LocatorPhase::Resolved(resolution.address));
                info!(
                    "IP address at MAC address {}: {}",
                    resolution.identity, resolution.address
                );
                Ok(resolution)
            }
            Err(e) => {
                state.advance(LocatorPhase::Failed(e.kind));
                Err(e)
            }
        }
    }

    async fn try_resolve(&self, state: &ResolutionState) -> FetchResult<Resolution> {
        let identity = *state.identity();

        if let Some(cached) = state.cached_address() {
            let secret = self
                .credentials
                .privileged_secret()
                .ok_or_else(|| FetchError::missing_privileged_credential(cached))?;
            if verify_cached_address(&self.tools, cached, &identity, secret).await {
                return Ok(Resolution {
                    identity,
                    address: cached,
                    source: ResolutionSource::CachedProbe,
                });
            }
            info!(
                "Cached address {} is stale for {}, falling back to a full scan",
                cached, identity
            );
        }

        let address = scan_for_address(&self.tools, &self.subnet, &identity).await?;
        Ok(Resolution {
            identity,
            address,
            source: ResolutionSource::SubnetScan,
        })
    }
}
