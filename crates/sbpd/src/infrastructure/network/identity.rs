//! Player identity: the MAC address commands are addressed to.
//!
//! The server knows the local player by the MAC address the player software
//! registered with, so the lookup mirrors the one squeezelite performs:
//!
//! 1. the `UTMAC` environment variable, if it holds a 17-character
//!    `xx:xx:xx:xx:xx:xx` address;
//! 2. otherwise the first non-loopback interface under `/sys/class/net`
//!    (in name order) whose first three address bytes are not all zero.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

/// Environment variable overriding the interface lookup.
pub const MAC_ENV_VAR: &str = "UTMAC";

/// Where the kernel lists network interfaces.
pub const SYS_CLASS_NET: &str = "/sys/class/net";

/// A 6-byte hardware address.
pub type MacAddress = [u8; 6];

/// Error type for identity lookup.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no usable MAC address found (set --mac or UTMAC)")]
    NotFound,
}

/// Formats `mac` as zero-padded lower-case hex, e.g. `b8:27:eb:01:02:03`.
pub fn format_mac(mac: &MacAddress) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Parses a 17-character `xx:xx:xx:xx:xx:xx` address.
pub fn parse_mac(text: &str) -> Option<MacAddress> {
    let text = text.trim();
    if text.len() != 17 {
        return None;
    }
    let mut mac = [0u8; 6];
    let mut parts = text.split(':');
    for byte in &mut mac {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    parts.next().is_none().then_some(mac)
}

/// Looks up the player MAC from the environment and the host's interfaces.
///
/// # Errors
///
/// Returns [`IdentityError::NotFound`] if no source yields an address.
pub fn find_mac() -> Result<String, IdentityError> {
    let env_value = std::env::var(MAC_ENV_VAR).ok();
    let mac = find_mac_in(env_value.as_deref(), Path::new(SYS_CLASS_NET))?;
    let formatted = format_mac(&mac);
    info!(mac = %formatted, "MAC address found");
    Ok(formatted)
}

/// [`find_mac`] with explicit sources.
///
/// # Errors
///
/// Returns [`IdentityError::NotFound`] if neither source yields an address.
pub fn find_mac_in(
    env_value: Option<&str>,
    sys_class_net: &Path,
) -> Result<MacAddress, IdentityError> {
    if let Some(mac) = env_value.and_then(parse_mac) {
        debug!("MAC address taken from {MAC_ENV_VAR}");
        return Ok(mac);
    }
    interface_mac(sys_class_net).ok_or(IdentityError::NotFound)
}

fn interface_mac(sys_class_net: &Path) -> Option<MacAddress> {
    let mut names: Vec<String> = std::fs::read_dir(sys_class_net)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    names.iter().find_map(|name| {
        let text = std::fs::read_to_string(sys_class_net.join(name).join("address")).ok()?;
        let mac = parse_mac(&text)?;
        if mac[..3] == [0, 0, 0] {
            debug!(interface = %name, "skipping interface without vendor prefix");
            return None;
        }
        debug!(interface = %name, "MAC address taken from interface");
        Some(mac)
    })
}
