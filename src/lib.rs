//! HetrixTools uptime sensor platform.
//!
//! Polls the HetrixTools uptime report API once per monitor per cycle and
//! exposes each monitor as a status sensor. Failures never propagate out of
//! a polling cycle: they are logged and the sensor keeps its last state.

pub mod config;
pub mod host;
pub mod poller;
pub mod sensor;

pub use config::{ConfigError, MonitorConfig, PlatformConfig};
pub use host::{run, setup_platform, setup_with_poller, update_all};
pub use poller::{MonitorPoller, PollError, API_BASE, REQUEST_TIMEOUT};
pub use sensor::{Entity, MonitorSensor, SensorSnapshot};
