//! # pifetch – discovery
//!
//! Resolves the current IPv4 address of a device from its MAC address:
//!   • `tools`   – the `sudo`/`nmap`/`arp` subprocess boundary
//!   • `prober`  – cheap single-host check of a cached address
//!   • `scanner` – full subnet sweep + neighbor-table lookup
//!   • `locator` – the cached-then-scan policy

pub mod locator;
pub mod prober;
pub mod scanner;
pub mod tools;

pub use locator::{
    DeviceLocator, LocatorPhase, Resolution, ResolutionSource, ResolutionState, DEFAULT_SUBNET,
};
pub use prober::{probe_output_matches, verify_cached_address};
pub use scanner::{find_in_neighbor_table, parse_neighbor_table, scan_for_address, NeighborEntry};
pub use tools::{DiscoveryTools, SystemTools};
