//! Sensor host: platform setup and the polling scheduler.
//!
//! Sensors are refreshed one after another inside a cycle, and missed ticks
//! are skipped, so each monitor has at most one request in flight.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::PlatformConfig;
use crate::poller::MonitorPoller;
use crate::sensor::{Entity, MonitorSensor};

/// Build one sensor per configured monitor and refresh each before returning.
pub async fn setup_platform(config: &PlatformConfig, client: Client) -> Vec<MonitorSensor> {
    let poller = Arc::new(MonitorPoller::new(client, config.api_key.clone()));
    setup_with_poller(config, poller).await
}

/// Same as [`setup_platform`], with a preconfigured poller.
pub async fn setup_with_poller(
    config: &PlatformConfig,
    poller: Arc<MonitorPoller>,
) -> Vec<MonitorSensor> {
    let mut sensors: Vec<MonitorSensor> = config
        .monitors
        .iter()
        .cloned()
        .map(|monitor| MonitorSensor::new(monitor, Arc::clone(&poller)))
        .collect();

    info!(count = sensors.len(), "Setting up HetrixTools sensors");
    update_all(&mut sensors).await;
    sensors
}

/// One polling cycle across every sensor.
pub async fn update_all<E: Entity>(sensors: &mut [E]) {
    for sensor in sensors.iter_mut() {
        sensor.update().await;
    }

    let refreshed = sensors.iter().filter(|s| s.state().is_some()).count();
    debug!(total = sensors.len(), with_state = refreshed, "Polling cycle complete");
}

/// Refresh all sensors every `interval`, forever.
pub async fn run<E: Entity>(sensors: &mut [E], interval: Duration) {
    let mut timer = time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer.tick().await; // setup already ran the first cycle

    info!(interval_secs = interval.as_secs(), "HetrixTools poller started");

    loop {
        timer.tick().await;
        update_all(sensors).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEntity {
        id: String,
        updates: usize,
        state: Option<String>,
    }

    #[async_trait]
    impl Entity for CountingEntity {
        fn unique_id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> String {
            self.id.clone()
        }
        fn state(&self) -> Option<&str> {
            self.state.as_deref()
        }
        async fn update(&mut self) {
            self.updates += 1;
            self.state = Some(self.updates.to_string());
        }
    }

    fn entities(n: usize) -> Vec<CountingEntity> {
        (0..n)
            .map(|i| CountingEntity { id: format!("m{}", i), updates: 0, state: None })
            .collect()
    }

    #[tokio::test]
    async fn test_update_all_touches_every_entity_once() {
        let mut sensors = entities(3);
        update_all(&mut sensors).await;
        assert!(sensors.iter().all(|s| s.updates == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_interval() {
        let mut sensors = entities(2);
        let _ = time::timeout(Duration::from_secs(185), run(&mut sensors, Duration::from_secs(60))).await;
        // ticks at 60, 120 and 180 seconds
        assert!(sensors.iter().all(|s| s.updates == 3));
    }

    /// First update outlasts two intervals, later ones are instant.
    struct SlowStartEntity {
        started: time::Instant,
        starts: Vec<u64>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Entity for SlowStartEntity {
        fn unique_id(&self) -> &str {
            "slow"
        }
        fn name(&self) -> String {
            "slow".into()
        }
        fn state(&self) -> Option<&str> {
            None
        }
        async fn update(&mut self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.starts.push(self.started.elapsed().as_secs());
            if self.starts.len() == 1 {
                time::sleep(Duration::from_secs(150)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_skips_missed_ticks_without_overlap() {
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let mut sensors = vec![SlowStartEntity {
            started: time::Instant::now(),
            starts: Vec::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::clone(&max_in_flight),
        }];

        let _ = time::timeout(Duration::from_secs(305), run(&mut sensors, Duration::from_secs(60))).await;

        // slow cycle runs 60..210; the ticks due at 120 and 180 collapse into
        // one at 210, then the schedule realigns to 240 and 300
        assert_eq!(sensors[0].starts, vec![60, 210, 240, 300]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }
}
