// ── Address allocation ──
//
// Addresses are handed out by walking forward from a per-device cursor.
// The walk never wraps: once the next candidate leaves the host range
// of the device network the device is exhausted, even if lower
// addresses have been freed since.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// Step to the next candidate after `addr`.
///
/// A low octet of 254 or more carries into the next octet and restarts
/// at `.1`, so `.0` and `.255` are never produced. Returns `None` past
/// the top of the address space.
pub fn next_candidate(addr: Ipv4Addr) -> Option<Ipv4Addr> {
    let value = u32::from(addr);
    if value & 0xFF < 254 {
        return Some(Ipv4Addr::from(value + 1));
    }
    (value & !0xFF)
        .checked_add(0x100)
        .map(|base| Ipv4Addr::from(base | 1))
}

/// Whether `addr` is a usable host address of `network`.
pub fn is_host_address(network: Ipv4Net, addr: Ipv4Addr) -> bool {
    if !network.contains(&addr) {
        return false;
    }
    network.prefix_len() >= 31 || (addr != network.network() && addr != network.broadcast())
}

/// First free address after `start` within `network`, skipping `taken`.
///
/// `None` means the walk left the host range: the network is exhausted
/// from the cursor onwards.
pub fn allocate(network: Ipv4Net, start: Ipv4Addr, taken: &HashSet<Ipv4Addr>) -> Option<Ipv4Addr> {
    let mut candidate = next_candidate(start);
    while let Some(addr) = candidate {
        if !is_host_address(network, addr) {
            return None;
        }
        if !taken.contains(&addr) {
            return Some(addr);
        }
        candidate = next_candidate(addr);
    }
    None
}
