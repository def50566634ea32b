//! Configuration consumed by [`SyslogTransport`](crate::SyslogTransport).
//!
//! Values are read once at construction. [`TransportConfig::from_env`] reads
//! the process environment; every variable is optional and falls back to the
//! matching `DEFAULT_*` constant. The struct also implements
//! [`serde::Deserialize`] so a host application can embed it in its own
//! configuration file, with durations spelled in seconds or milliseconds.

use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::warn;
use serde::Deserialize;

use crate::{
    error::TransportError, priority::Facility, rate_limited_warner::DEFAULT_WARN_INTERVAL,
};

/// Directory receiving undeliverable batches.
pub const DEFAULT_OVERFLOW_DIR: &str = "/data/syslog_buffer";
/// Messages per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Maximum time a batching window stays open.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(3);
/// Connect and write timeout for a single send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(3000);
/// Age after which a pooled connection is discarded.
pub const DEFAULT_CONN_LIFETIME: Duration = Duration::from_secs(100);
/// Capacity of the in-memory message buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100_000;
/// Maximum number of idle pooled connections.
pub const DEFAULT_POOL_CAPACITY: usize = 30;
/// Maximum number of concurrent sends.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 30;
/// Wait applied to buffer and pool queue operations.
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_millis(10);
/// Wait for a send permit before spilling to disk.
pub const DEFAULT_PERMIT_TIMEOUT: Duration = Duration::from_millis(10);

pub const ENV_OVERFLOW_DIR: &str = "SYSLOG_BUFFER";
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub const ENV_LINGER_SECS: &str = "Linger";
pub const ENV_SEND_TIMEOUT_MS: &str = "SYSLOG_TIMEOUT";
pub const ENV_CONN_LIFETIME_SECS: &str = "SYSLOG_CONN_LIFE_TIME";
pub const ENV_FACILITY: &str = "SYSLOG_FACILITY";

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(TransportError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub overflow_dir: PathBuf,
    pub batch_size: usize,
    #[serde(rename = "linger_secs", deserialize_with = "de::secs")]
    pub linger: Duration,
    #[serde(rename = "send_timeout_ms", deserialize_with = "de::millis")]
    pub send_timeout: Duration,
    #[serde(rename = "conn_lifetime_secs", deserialize_with = "de::secs")]
    pub conn_lifetime: Duration,
    pub facility: Facility,
    pub buffer_capacity: usize,
    pub pool_capacity: usize,
    pub max_in_flight: usize,
    #[serde(rename = "queue_timeout_ms", deserialize_with = "de::millis")]
    pub queue_timeout: Duration,
    #[serde(rename = "permit_timeout_ms", deserialize_with = "de::millis")]
    pub permit_timeout: Duration,
    #[serde(rename = "warn_interval_secs", deserialize_with = "de::secs")]
    pub warn_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            overflow_dir: PathBuf::from(DEFAULT_OVERFLOW_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            linger: DEFAULT_LINGER,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            conn_lifetime: DEFAULT_CONN_LIFETIME,
            facility: Facility::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
            permit_timeout: DEFAULT_PERMIT_TIMEOUT,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unparsable values are ignored with a warning and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let overflow_dir = lookup(ENV_OVERFLOW_DIR)
            .map(|raw| raw.trim().trim_end_matches('/').to_owned())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.overflow_dir);
        Self {
            overflow_dir,
            batch_size: parse_var(&lookup, ENV_BATCH_SIZE, defaults.batch_size),
            linger: Duration::from_secs(parse_var(
                &lookup,
                ENV_LINGER_SECS,
                defaults.linger.as_secs(),
            )),
            send_timeout: Duration::from_millis(parse_var(
                &lookup,
                ENV_SEND_TIMEOUT_MS,
                millis(defaults.send_timeout),
            )),
            conn_lifetime: Duration::from_secs(parse_var(
                &lookup,
                ENV_CONN_LIFETIME_SECS,
                defaults.conn_lifetime.as_secs(),
            )),
            facility: parse_var(&lookup, ENV_FACILITY, defaults.facility),
            ..defaults
        }
    }

    pub fn with_overflow_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overflow_dir = dir.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_conn_lifetime(mut self, lifetime: Duration) -> Self {
        self.conn_lifetime = lifetime;
        self
    }

    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit;
        self
    }

    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    pub fn with_permit_timeout(mut self, timeout: Duration) -> Self {
        self.permit_timeout = timeout;
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval = interval;
        self
    }

    /// Reject values the transport cannot run with.
    ///
    /// A zero linger would turn the batching loop into a spin; zero timeouts
    /// cannot be applied to sockets.
    pub fn validate(&self) -> Result<(), TransportError> {
        ensure_positive!(self.batch_size, "batch_size")?;
        ensure_positive!(self.buffer_capacity, "buffer_capacity")?;
        ensure_positive!(self.pool_capacity, "pool_capacity")?;
        ensure_positive!(self.max_in_flight, "max_in_flight")?;
        ensure_positive!(self.linger.as_nanos(), "linger")?;
        ensure_positive!(self.send_timeout.as_nanos(), "send_timeout")?;
        ensure_positive!(self.queue_timeout.as_nanos(), "queue_timeout")?;
        if self.overflow_dir.as_os_str().is_empty() {
            return Err(TransportError::InvalidConfig(
                "overflow_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(err) => {
            warn!("ignoring {key}={raw:?}: {err}");
            default
        }
    }
}

mod de {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn secs<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }

    pub(super) fn millis<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
