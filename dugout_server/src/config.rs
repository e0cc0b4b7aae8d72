// Server configuration.
//
// `ServerConfig` is what `start_server` needs: where to listen and where (if
// anywhere) to append the audit trail. The binary fills it from CLI flags and
// environment variables (see `main.rs`); tests build it directly, usually
// with port 0 so the OS picks a free port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind. Defaults to all interfaces.
    pub bind: IpAddr,
    pub port: u16,
    /// JSON-lines audit file. `None` disables auditing.
    pub audit_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            audit_log: None,
        }
    }
}

impl ServerConfig {
    /// Loopback on an OS-assigned port, no audit. For tests and embedding.
    pub fn loopback() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            audit_log: None,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces_port_5000() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert!(config.audit_log.is_none());
    }

    #[test]
    fn loopback_uses_ephemeral_port() {
        let config = ServerConfig::loopback();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:0");
    }
}
