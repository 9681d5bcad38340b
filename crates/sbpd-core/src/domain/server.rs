//! The media server endpoint and the parameter flags that describe where each
//! of its fields came from.
//!
//! Every field of [`ServerEndpoint`] is either supplied by the user (command
//! line or config file) or learned at runtime by discovery.  Two
//! [`ConfigParameters`] masks track this: `configured` is fixed at startup and
//! excludes a field from discovery forever; `discovered` records what discovery
//! has found so far and may be cleared again when the server moves.

use std::fmt;

/// Bit set of server / player parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConfigParameters(pub u16);

impl ConfigParameters {
    pub const HOST: u16 = 0x0001;
    pub const PORT: u16 = 0x0002;
    pub const USER: u16 = 0x0004;
    pub const PASSWORD: u16 = 0x0008;
    /// Hardware identity (MAC address) of the player.
    pub const MAC: u16 = 0x1000;

    /// An empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` if every bit in `flags` is set.
    pub fn contains(&self, flags: u16) -> bool {
        self.0 & flags == flags
    }

    pub fn insert(&mut self, flags: u16) {
        self.0 |= flags;
    }

    pub fn remove(&mut self, flags: u16) {
        self.0 &= !flags;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ConfigParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::HOST, "host"),
            (Self::PORT, "port"),
            (Self::USER, "user"),
            (Self::PASSWORD, "password"),
            (Self::MAC, "mac"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", set.join(","))
    }
}

/// Where commands are sent: address, control port, and optional credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// Host name or dotted-decimal IPv4 address.  `None` until known.
    pub host: Option<String>,
    /// JSON-RPC control port.  `None` until known.
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ServerEndpoint {
    /// Returns `true` once both host and port are known.
    pub fn is_resolved(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    /// Returns `host:port` when the endpoint is resolved.
    pub fn authority(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(format!("{host}:{port}")),
            _ => None,
        }
    }

    /// Basic-auth credentials, only when both user and password are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parameters_insert_and_remove() {
        // Arrange
        let mut params = ConfigParameters::empty();

        // Act
        params.insert(ConfigParameters::HOST | ConfigParameters::PORT);
        params.remove(ConfigParameters::PORT);

        // Assert
        assert!(params.contains(ConfigParameters::HOST));
        assert!(!params.contains(ConfigParameters::PORT));
        assert!(!params.is_empty());
    }

    #[test]
    fn test_config_parameters_contains_requires_all_bits() {
        let params = ConfigParameters(ConfigParameters::HOST);
        assert!(!params.contains(ConfigParameters::HOST | ConfigParameters::PORT));
    }

    #[test]
    fn test_config_parameters_display_lists_set_flags() {
        let params = ConfigParameters(ConfigParameters::HOST | ConfigParameters::MAC);
        assert_eq!(params.to_string(), "[host,mac]");
    }

    #[test]
    fn test_endpoint_is_resolved_only_with_host_and_port() {
        let mut endpoint = ServerEndpoint::default();
        assert!(!endpoint.is_resolved());

        endpoint.host = Some("192.168.1.20".to_string());
        assert!(!endpoint.is_resolved());
        assert_eq!(endpoint.authority(), None);

        endpoint.port = Some(9000);
        assert!(endpoint.is_resolved());
        assert_eq!(endpoint.authority().as_deref(), Some("192.168.1.20:9000"));
    }

    #[test]
    fn test_credentials_require_user_and_password() {
        let mut endpoint = ServerEndpoint {
            user: Some("admin".to_string()),
            ..ServerEndpoint::default()
        };
        assert_eq!(endpoint.credentials(), None);

        endpoint.password = Some("secret".to_string());
        assert_eq!(endpoint.credentials(), Some(("admin", "secret")));
    }
}
