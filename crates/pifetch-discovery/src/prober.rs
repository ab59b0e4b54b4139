// ── Cached-address prober ────────────────────────────────────────────────────
//
// Scanning the whole subnet takes a while, so a previously known address is
// checked first with a single-host probe. A stale cache is expected, not a
// fault: every failure here is reported as `false`.

use crate::tools::DiscoveryTools;
use log::{debug, warn};
use pifetch_core::DeviceIdentity;
use secrecy::SecretString;
use std::net::Ipv4Addr;

/// Does the first hardware token in `output` equal `identity`?
pub fn probe_output_matches(output: &str, identity: &DeviceIdentity) -> bool {
    match DeviceIdentity::find_in(output) {
        Some(found) => found == *identity,
        None => false,
    }
}

/// True only when the device at `address` currently answers with `identity`.
pub async fn verify_cached_address<T>(
    tools: &T,
    address: Ipv4Addr,
    identity: &DeviceIdentity,
    secret: &SecretString,
) -> bool
where
    T: DiscoveryTools + ?Sized,
{
    let output = match tools.probe_host(address, secret).await {
        Ok(output) => output,
        Err(e) => {
            warn!("Probe of cached address {} failed: {}", address, e);
            return false;
        }
    };

    let matched = probe_output_matches(&output, identity);
    if matched {
        debug!("Cached address {} still belongs to {}", address, identity);
    } else {
        debug!("Cached address {} no longer answers as {}", address, identity);
    }
    matched
}
