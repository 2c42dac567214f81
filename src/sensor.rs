//! Monitor sensor: the entity exposed for each configured monitor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::poller::MonitorPoller;

/// Report field carried as the sensor state.
pub const STATE_FIELD: &str = "Uptime_Status";

/// State used when a report arrives without a usable status field.
pub const UNKNOWN_STATE: &str = "unknown";

/// An entity the host registers and refreshes on every polling cycle.
///
/// `update` must never fail outward: implementations log their own errors
/// and keep the previous state.
#[async_trait]
pub trait Entity: Send + Sync {
    fn unique_id(&self) -> &str;

    fn name(&self) -> String;

    fn state(&self) -> Option<&str>;

    /// Run one polling cycle.
    async fn update(&mut self);
}

/// Serializable view of a sensor, used for CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub unique_id: String,
    pub name: String,
    pub state: Option<String>,
    pub attributes: Map<String, Value>,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct MonitorSensor {
    monitor: MonitorConfig,
    poller: Arc<MonitorPoller>,
    state: Option<String>,
    attributes: Map<String, Value>,
    last_updated: Option<DateTime<Utc>>,
}

impl MonitorSensor {
    pub fn new(monitor: MonitorConfig, poller: Arc<MonitorPoller>) -> Self {
        Self {
            monitor,
            poller,
            state: None,
            attributes: Map::new(),
            last_updated: None,
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            unique_id: self.monitor.id.clone(),
            name: self.name(),
            state: self.state.clone(),
            attributes: self.attributes.clone(),
            last_updated: self.last_updated,
        }
    }

    /// Replace state and attributes with a freshly fetched report.
    pub fn apply_report(&mut self, report: Value) {
        let (state, attributes) = split_report(report);
        if self.state.as_deref() != Some(state.as_str()) {
            info!(
                monitor_id = %self.monitor.id,
                from = self.state.as_deref().unwrap_or("none"),
                to = %state,
                "Monitor state changed"
            );
        }
        self.state = Some(state);
        self.attributes = attributes;
        self.last_updated = Some(Utc::now());
    }
}

#[async_trait]
impl Entity for MonitorSensor {
    fn unique_id(&self) -> &str {
        &self.monitor.id
    }

    fn name(&self) -> String {
        match &self.monitor.name {
            Some(name) => name.clone(),
            None => format!("HetrixTools {}", self.monitor.id),
        }
    }

    fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    async fn update(&mut self) {
        match self.poller.poll(&self.monitor.id).await {
            Some(report) => self.apply_report(report),
            None => debug!(monitor_id = %self.monitor.id, "Keeping last known state"),
        }
    }
}

/// Split a report into (state, attributes).
fn split_report(report: Value) -> (String, Map<String, Value>) {
    match report {
        Value::Object(mut fields) => {
            let state = match fields.remove(STATE_FIELD) {
                Some(Value::String(s)) => s,
                _ => UNKNOWN_STATE.to_string(),
            };
            (state, fields)
        }
        _ => (UNKNOWN_STATE.to_string(), Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sensor(name: Option<&str>) -> MonitorSensor {
        let poller = MonitorPoller::new(reqwest::Client::new(), "K");
        MonitorSensor::new(
            MonitorConfig { id: "m1".into(), name: name.map(String::from) },
            Arc::new(poller),
        )
    }

    #[test]
    fn test_name_falls_back_to_id() {
        assert_eq!(sensor(None).name(), "HetrixTools m1");
        assert_eq!(sensor(Some("Website")).name(), "Website");
        assert_eq!(sensor(None).unique_id(), "m1");
    }

    #[test]
    fn test_initial_state_absent() {
        let s = sensor(None);
        assert_eq!(s.state(), None);
        assert!(s.attributes().is_empty());
        assert!(s.last_updated().is_none());
    }

    #[test]
    fn test_apply_report_splits_state_and_attributes() {
        let mut s = sensor(None);
        s.apply_report(json!({
            "Uptime_Status": "online",
            "Monitor_Name": "Website",
            "Uptime": "99.98"
        }));
        assert_eq!(s.state(), Some("online"));
        assert_eq!(s.attributes().get("Monitor_Name"), Some(&json!("Website")));
        assert!(!s.attributes().contains_key(STATE_FIELD));
        assert!(s.last_updated().is_some());
    }

    #[test]
    fn test_report_without_status_is_unknown() {
        let mut s = sensor(None);
        s.apply_report(json!({ "Uptime_Status": 1 }));
        assert_eq!(s.state(), Some(UNKNOWN_STATE));

        s.apply_report(json!(["not", "an", "object"]));
        assert_eq!(s.state(), Some(UNKNOWN_STATE));
        assert!(s.attributes().is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut s = sensor(Some("Website"));
        s.apply_report(json!({ "Uptime_Status": "offline" }));
        let out = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(out["unique_id"], "m1");
        assert_eq!(out["name"], "Website");
        assert_eq!(out["state"], "offline");
    }
}
