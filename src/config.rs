//! Connection configuration for a session client.

use std::time::Duration;

/// Immutable connection settings supplied at construction.
///
/// The client never reads process environment state; callers that want
/// env-driven setup resolve it themselves and pass the result here.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Target address including scheme, eg `ws://localhost`.
    pub address: String,
    /// Target port.
    pub port: u16,
    /// Route appended to the address, eg `/ws/chat`.
    pub route: String,
    /// Ceiling for automatic reconnect attempts.
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Silence duration after which the watchdog closes the connection.
    pub inactivity_timeout: Duration,
    /// Enables chatty per-frame debug logging.
    pub debug: bool,
}

impl SessionConfig {
    /// Creates a config for the given address with default tuning.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the target port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the route appended to the address.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Sets the automatic reconnect attempt ceiling.
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the fixed delay between reconnect attempts.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the inactivity watchdog duration.
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Enables or disables chatty debug logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: "ws://localhost".to_string(),
            port: 8080,
            route: "/ws/chat".to_string(),
            max_reconnect_attempts: 5,
            reconnect_interval: Duration::from_secs(3),
            inactivity_timeout: Duration::from_secs(30),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::SessionConfig;

    #[test]
    fn defaults_match_documented_values() {
        let config = SessionConfig::default();
        assert_eq!(config.address, "ws://localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.route, "/ws/chat");
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_interval, Duration::from_secs(3));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(30));
        assert!(!config.debug);
    }

    #[test]
    fn builders_override_fields() {
        let config = SessionConfig::new("ws://127.0.0.1")
            .with_port(9001)
            .with_route("/ws/test")
            .with_max_reconnect_attempts(2)
            .with_reconnect_interval(Duration::from_millis(100))
            .with_inactivity_timeout(Duration::from_millis(500))
            .with_debug(true);
        assert_eq!(config.address, "ws://127.0.0.1");
        assert_eq!(config.port, 9001);
        assert_eq!(config.route, "/ws/test");
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_interval, Duration::from_millis(100));
        assert_eq!(config.inactivity_timeout, Duration::from_millis(500));
        assert!(config.debug);
    }
}
