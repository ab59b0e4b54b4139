//! Subnet scanner – sweep the subnet, then look the MAC up in the
//! neighbor (ARP) table.
//!
//! Accepted table layouts, one entry per line:
//!
//! ```text
//! ? (192.168.1.42) at b8:27:eb:0a:1b:ff [ether] on wlan0     # Linux arp -a
//! ? (192.168.1.42) at b8:27:eb:a:1b:ff on en0 ifscope [ethernet]  # macOS
//!   192.168.1.42          b8-27-eb-0a-1b-ff     dynamic      # Windows
//! ```

use crate::tools::DiscoveryTools;
use lazy_static::lazy_static;
use log::{debug, info};
use pifetch_core::{DeviceIdentity, FetchError, FetchResult};
use regex::Regex;
use std::net::Ipv4Addr;

lazy_static! {
    static ref TABLE_MAC: Regex =
        Regex::new(r"\b[0-9A-Fa-f]{1,2}(?:[:-][0-9A-Fa-f]{1,2}){5}\b").unwrap();
    static ref IPV4: Regex = Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap();
}

/// One parsed neighbor-table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborEntry {
    pub address: Ipv4Addr,
    pub identity: DeviceIdentity,
}

/// Parse one record. `None` for headers, `(incomplete)` entries and
/// anything else lacking both a hardware token and an IPv4 address.
pub fn parse_neighbor_record(record: &str) -> Option<NeighborEntry> {
    let identity = TABLE_MAC
        .find_iter(record)
        .find_map(|m| DeviceIdentity::parse_lenient(m.as_str()))?;
    let address = IPV4
        .find_iter(record)
        .find_map(|m| m.as_str().parse::<Ipv4Addr>().ok())?;
    Some(NeighborEntry { address, identity })
}

/// Every well-formed entry, in table order.
pub fn parse_neighbor_table(table: &str) -> Vec<NeighborEntry> {
    table.lines().filter_map(parse_neighbor_record).collect()
}

/// Address of the first entry owned by `identity`.
///
/// Duplicate entries (a stale one left over from an earlier lease) are not
/// disambiguated: the first in table order wins.
pub fn find_in_neighbor_table(table: &str, identity: &DeviceIdentity) -> Option<Ipv4Addr> {
    let mut matches = parse_neighbor_table(table)
        .into_iter()
        .filter(|e| e.identity == *identity);
    let first = matches.next()?;
    let extra: Vec<Ipv4Addr> = matches.map(|e| e.address).collect();
    if !extra.is_empty() {
        debug!(
            "{} appears {} more time(s) in the neighbor table ({:?}); using {}",
            identity,
            extra.len(),
            extra,
            first.address
        );
    }
    Some(first.address)
}

/// Sweep `subnet` and resolve `identity` from the refreshed neighbor table.
pub async fn scan_for_address<T>(
    tools: &T,
    subnet: &str,
    identity: &DeviceIdentity,
) -> FetchResult<Ipv4Addr>
where
    T: DiscoveryTools + ?Sized,
{
    info!("Scanning {} for {}", subnet, identity);
    tools.sweep_subnet(subnet).await?;
    let table = tools.neighbor_table().await?;
    find_in_neighbor_table(&table, identity).ok_or_else(|| {
        FetchError::address_not_found(identity).with_detail(format!("subnet {}", subnet))
    })
}
