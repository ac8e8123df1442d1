//! Node and sink configuration.
//!
//! Every setting can be overridden with a `UWSINK_*` environment variable;
//! unset variables fall back to the defaults below.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use uwsink_auth::AuthConfig;
use uwsink_stats::OrderPolicy;
use uwsink_store::{NodeAddr, SinkId};

use crate::error::{Error, Result};
use crate::packet::Priority;
use crate::traffic::TrafficPattern;

/// Configuration of one sink module.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Identity written into first-receiver and credential records
    pub sink_id: SinkId,
    /// Own address, used as the source of transmitted packets
    pub address: NodeAddr,
    /// Destination of periodic traffic
    pub dest_addr: NodeAddr,
    /// Destination port of transmitted packets
    pub dest_port: u16,
    /// Size of periodic packets in bytes
    pub packet_size: u32,
    /// Mean interval between periodic packets in seconds
    pub period: f64,
    /// Exponential inter-arrival times instead of a constant period
    pub poisson: bool,
    /// Default transmission priority
    pub priority: Priority,
    /// Role tag of periodic packets
    pub traffic_role: u32,
    /// Sequence ordering policy
    pub order_policy: OrderPolicy,
    /// Credential lifetimes and response sizes
    pub auth: AuthConfig,
    /// Whether first-receiver traces are written
    pub trace_enabled: bool,
    /// Directory holding trace files
    pub trace_dir: PathBuf,
    /// Trace file suffix to open at startup
    pub trace_suffix: Option<String>,
    /// Seed for the traffic generator; random when unset
    pub seed: Option<u64>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sink_id: 0,
            address: 0,
            dest_addr: 0,
            dest_port: 0,
            packet_size: 125,
            period: 60.0,
            poisson: false,
            priority: Priority::Low,
            traffic_role: 0,
            order_policy: OrderPolicy::DropDuplicates,
            auth: AuthConfig::default(),
            trace_enabled: false,
            trace_dir: PathBuf::from("."),
            trace_suffix: None,
            seed: None,
        }
    }
}

impl SinkConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let auth = AuthConfig {
            key_expiry: parse_var(&lookup, "UWSINK_KEY_EXPIRY", d.auth.key_expiry)?,
            reauth_expiry: parse_var(&lookup, "UWSINK_REAUTH_EXPIRY", d.auth.reauth_expiry)?,
            grant_size: parse_var(&lookup, "UWSINK_AUTH_RESPONSE_SIZE", d.auth.grant_size)?,
            ..d.auth
        };
        let order_policy = if parse_var(&lookup, "UWSINK_STRICT_ORDER", false)? {
            OrderPolicy::StrictOrder
        } else {
            OrderPolicy::DropDuplicates
        };

        Ok(Self {
            sink_id: parse_var(&lookup, "UWSINK_SINK_ID", d.sink_id)?,
            address: parse_var(&lookup, "UWSINK_ADDRESS", d.address)?,
            dest_addr: parse_var(&lookup, "UWSINK_DEST_ADDR", d.dest_addr)?,
            dest_port: parse_var(&lookup, "UWSINK_DEST_PORT", d.dest_port)?,
            packet_size: parse_var(&lookup, "UWSINK_PACKET_SIZE", d.packet_size)?,
            period: parse_var(&lookup, "UWSINK_PERIOD", d.period)?,
            poisson: parse_var(&lookup, "UWSINK_POISSON", d.poisson)?,
            priority: parse_var(&lookup, "UWSINK_PRIORITY", d.priority)?,
            traffic_role: parse_var(&lookup, "UWSINK_TRAFFIC_ROLE", d.traffic_role)?,
            order_policy,
            auth,
            trace_enabled: parse_var(&lookup, "UWSINK_TRACE", d.trace_enabled)?,
            trace_dir: lookup("UWSINK_TRACE_DIR").map(PathBuf::from).unwrap_or(d.trace_dir),
            trace_suffix: lookup("UWSINK_TRACE_SUFFIX"),
            seed: lookup("UWSINK_SEED").map(|v| parse_value("UWSINK_SEED", &v)).transpose()?,
        })
    }

    /// Reject settings the sink cannot run with.
    pub fn validate(&self) -> Result<()> {
        TrafficPattern::new(self.period, self.poisson)?;
        if !self.auth.key_expiry.is_finite() || self.auth.key_expiry < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "key expiry must be a non-negative number of seconds, got {}",
                self.auth.key_expiry
            )));
        }
        if !self.auth.reauth_expiry.is_finite() || self.auth.reauth_expiry < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "re-auth expiry must be a non-negative number of seconds, got {}",
                self.auth.reauth_expiry
            )));
        }
        Ok(())
    }

    /// The periodic traffic pattern these settings describe.
    pub fn traffic_pattern(&self) -> Result<TrafficPattern> {
        TrafficPattern::new(self.period, self.poisson)
    }

    #[must_use]
    pub fn with_sink_id(mut self, sink_id: SinkId) -> Self {
        self.sink_id = sink_id;
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: NodeAddr) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub fn with_period(mut self, period: f64, poisson: bool) -> Self {
        self.period = period;
        self.poisson = poisson;
        self
    }

    #[must_use]
    pub fn with_order_policy(mut self, policy: OrderPolicy) -> Self {
        self.order_policy = policy;
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable tracing into `dir`.
    #[must_use]
    pub fn with_trace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trace_enabled = true;
        self.trace_dir = dir.into();
        self
    }
}

/// Configuration of the sink daemon.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// UDP address inbound packets arrive on
    pub bind_addr: SocketAddr,

    /// UDP address transmitted packets are handed to
    pub downlink_addr: SocketAddr,

    /// Coordination store URL
    pub redis_url: String,

    /// Bound on each store round trip
    pub store_timeout: Duration,

    /// Admin socket path (for sink-admin CLI)
    pub admin_socket: PathBuf,

    /// Start periodic traffic right after launch
    pub autostart: bool,

    /// Unix time, in seconds, that packet timestamps count from. Every sink
    /// sharing a store must use the same value.
    pub clock_epoch: f64,

    /// The sink module itself
    pub sink: SinkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            downlink_addr: SocketAddr::from(([127, 0, 0, 1], 9200)),
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            store_timeout: Duration::from_millis(500),
            admin_socket: PathBuf::from("./uwsink-data/admin.sock"),
            autostart: false,
            clock_epoch: 0.0,
            sink: SinkConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let timeout_ms = parse_var(&lookup, "UWSINK_STORE_TIMEOUT_MS", d.store_timeout.as_millis() as u64)?;

        Ok(Self {
            bind_addr: parse_var(&lookup, "UWSINK_BIND_ADDR", d.bind_addr)?,
            downlink_addr: parse_var(&lookup, "UWSINK_DOWNLINK_ADDR", d.downlink_addr)?,
            redis_url: lookup("UWSINK_REDIS_URL").unwrap_or(d.redis_url),
            store_timeout: Duration::from_millis(timeout_ms),
            admin_socket: lookup("UWSINK_ADMIN_SOCKET").map(PathBuf::from).unwrap_or(d.admin_socket),
            autostart: parse_var(&lookup, "UWSINK_AUTOSTART", d.autostart)?,
            clock_epoch: parse_var(&lookup, "UWSINK_CLOCK_EPOCH", d.clock_epoch)?,
            sink: SinkConfig::from_lookup(&lookup)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.clock_epoch.is_finite() || self.clock_epoch < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "clock epoch must be a non-negative Unix time, got {}",
                self.clock_epoch
            )));
        }
        self.sink.validate()
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => parse_value(name, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfiguration(format!("invalid {}={:?}: {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = SinkConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SinkConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn overrides_apply() {
        let config = SinkConfig::from_lookup(lookup(&[
            ("UWSINK_SINK_ID", "7"),
            ("UWSINK_PERIOD", "2.5"),
            ("UWSINK_POISSON", "true"),
            ("UWSINK_STRICT_ORDER", "true"),
            ("UWSINK_KEY_EXPIRY", "30"),
            ("UWSINK_AUTH_RESPONSE_SIZE", "64"),
            ("UWSINK_PRIORITY", "high"),
            ("UWSINK_SEED", "42"),
        ]))
        .unwrap();

        assert_eq!(config.sink_id, 7);
        assert_eq!(config.period, 2.5);
        assert!(config.poisson);
        assert_eq!(config.order_policy, OrderPolicy::StrictOrder);
        assert_eq!(config.auth.key_expiry, 30.0);
        assert_eq!(config.auth.grant_size, 64);
        assert_eq!(config.auth.reauth_expiry, 100.0);
        assert_eq!(config.priority, Priority::High);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn unparsable_value_rejected() {
        let err = SinkConfig::from_lookup(lookup(&[("UWSINK_SINK_ID", "seven")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn non_positive_period_rejected() {
        for period in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = SinkConfig::default().with_period(period, false);
            assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn negative_expiry_rejected() {
        let config = SinkConfig::default().with_auth(AuthConfig::default().with_key_expiry(-1.0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn node_overrides_apply() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("UWSINK_BIND_ADDR", "127.0.0.1:7000"),
            ("UWSINK_STORE_TIMEOUT_MS", "50"),
            ("UWSINK_SINK_ID", "3"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.store_timeout, Duration::from_millis(50));
        assert_eq!(config.sink.sink_id, 3);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379/");
        assert_eq!(config.clock_epoch, 0.0);
    }

    #[test]
    fn clock_epoch_shared_setting() {
        let config = NodeConfig::from_lookup(lookup(&[("UWSINK_CLOCK_EPOCH", "1700000000")])).unwrap();
        assert_eq!(config.clock_epoch, 1_700_000_000.0);
        config.validate().unwrap();

        let config = NodeConfig::from_lookup(lookup(&[("UWSINK_CLOCK_EPOCH", "-5")])).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfiguration(_))));
    }
}
