//! Synthetic publishers for the in-memory transport.
//!
//! One thread per domain publishes a position on each of the four aircraft
//! feeds, an intelligence report and a messaging packet every interval.
//! Values are derived from the tick counter so runs are reproducible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::foundation::{DomainId, Timestamp};
use crate::domain::telemetry::{
    AircraftSource, CoreData, DomainSet, Intelligence, MessagingPacket, TopicKind,
};

use super::InMemoryTransport;

const BASE_LATITUDE: f64 = 39.92;
const BASE_LONGITUDE: f64 = 32.85;

/// Running set of publisher threads.
pub struct SimulatedFeed {
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<u64>>,
}

impl SimulatedFeed {
    /// Starts one publisher thread per domain in `domains`.
    pub fn start(transport: InMemoryTransport, domains: &DomainSet, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let workers = domains
            .iter()
            .map(|domain| {
                let transport = transport.clone();
                let stop = stop.clone();
                thread::spawn(move || publish_loop(&transport, domain, interval, &stop))
            })
            .collect();
        Self { stop, workers }
    }

    /// Stops every thread and returns how many samples were published.
    pub fn stop(mut self) -> u64 {
        self.stop.store(true, Ordering::SeqCst);
        self.workers
            .drain(..)
            .map(|worker| worker.join().unwrap_or(0))
            .sum()
    }
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn publish_loop(transport: &InMemoryTransport, domain: DomainId, interval: Duration, stop: &AtomicBool) -> u64 {
    for kind in TopicKind::ALL {
        transport.announce_publisher(domain, kind);
    }

    let mut published = 0;
    let mut tick: u64 = 0;
    while !stop.load(Ordering::SeqCst) {
        tick += 1;
        for source in AircraftSource::ALL {
            transport.publish(domain, TopicKind::Aircraft(source), position(domain, source, tick).into());
            published += 1;
        }
        transport.publish(domain, TopicKind::Intelligence, intelligence(domain, tick).into());
        transport.publish(domain, TopicKind::Messaging, messaging(domain, tick).into());
        published += 2;

        sleep_unless_stopped(interval, stop);
    }
    tracing::debug!(domain = %domain, published, "simulated feed stopped");
    published
}

fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) {
    let step = Duration::from_millis(20).min(interval);
    let mut slept = Duration::ZERO;
    while slept < interval && !stop.load(Ordering::SeqCst) {
        thread::sleep(step);
        slept += step;
    }
}

fn clock() -> (i64, u32) {
    let now = Timestamp::now();
    let dt = now.as_datetime();
    (dt.timestamp(), dt.timestamp_subsec_nanos())
}

fn position(domain: DomainId, source: AircraftSource, tick: u64) -> CoreData {
    let (seconds, nanos) = clock();
    let phase = tick as f64 * 0.05 + f64::from(source.aircraft_id()) * std::f64::consts::FRAC_PI_2;
    let radius = 0.02 + f64::from(domain.value()) * 0.01;
    CoreData {
        latitude: BASE_LATITUDE + radius * phase.sin(),
        longitude: BASE_LONGITUDE + radius * phase.cos(),
        altitude: 1200.0 + 50.0 * f64::from(source.aircraft_id()),
        time_seconds: seconds,
        time_nano_seconds: nanos,
        speed_mps: 60.0 + (tick % 10) as f64,
        orientation_degrees: (phase.to_degrees() + 90.0).rem_euclid(360.0),
    }
}

fn intelligence(domain: DomainId, tick: u64) -> Intelligence {
    let (seconds, nanos) = clock();
    Intelligence {
        vs_task_status: (tick % 4) as i32,
        vs_battery_percentage: 100.0 - (tick % 100) as f64,
        vs_signal_strength_dbm: -60.0 - (tick % 20) as f64,
        vs_system_error: false,
        td_target_ID: format!("T-{}-{}", domain, tick % 8),
        td_target_type: (tick % 3) as i32,
        td_location_latitude: BASE_LATITUDE + 0.01,
        td_location_longitude: BASE_LONGITUDE - 0.01,
        td_location_time_seconds: seconds,
        td_location_time_nano_seconds: nanos,
        td_confidence_level: 0.5 + (tick % 5) as f64 * 0.1,
        td_description: "vehicle".to_string(),
        ta_command: "observe".to_string(),
        ta_location_latitude: BASE_LATITUDE,
        ta_location_longitude: BASE_LONGITUDE,
        ta_location_time_seconds: seconds,
        ta_location_time_nano_seconds: nanos,
        ..Default::default()
    }
}

fn messaging(domain: DomainId, tick: u64) -> MessagingPacket {
    let (seconds, nanos) = clock();
    let sender = format!("uav-{}", domain);
    MessagingPacket {
        message_type: (tick % 3) as i32,
        sr_header_sender_id: sender.clone(),
        sr_header_time_seconds: seconds,
        sr_header_time_nano_seconds: nanos,
        sr_location_latitude: BASE_LATITUDE,
        sr_location_longitude: BASE_LONGITUDE,
        sr_status_task_status: 1,
        sr_status_battery_percentage: 100.0 - (tick % 100) as f64,
        cd_header_sender_id: sender.clone(),
        cd_detection_target_ID: format!("T-{}-{}", domain, tick % 8),
        cd_detection_confidence_level: 0.75,
        tc_header_sender_id: sender,
        tc_receiver_id: "ground".to_string(),
        tc_assignment_command: "hold".to_string(),
        ..Default::default()
    }
}
