//! Typed samples as delivered by the transport.
//!
//! Field order matters: it is the order fields appear in the emitted record
//! and, after reconstruction, in the viewer payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat position report published on the `CoreData*` topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreData {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub time_seconds: i64,
    pub time_nano_seconds: u32,
    pub speed_mps: f64,
    pub orientation_degrees: f64,
}

/// Flat vehicle status, target detection and task assignment report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct Intelligence {
    pub vs_task_status: i32,
    pub vs_battery_percentage: f64,
    pub vs_signal_strength_dbm: f64,
    pub vs_system_error: bool,
    pub td_target_ID: String,
    pub td_target_type: i32,
    pub td_location_latitude: f64,
    pub td_location_longitude: f64,
    pub td_location_altitude: f64,
    pub td_location_time_seconds: i64,
    pub td_location_time_nano_seconds: u32,
    pub td_location_speed_mps: f64,
    pub td_location_orientation_degrees: f64,
    pub td_confidence_level: f64,
    pub td_description: String,
    pub td_raw_data_link: String,
    pub ta_command: String,
    pub ta_location_latitude: f64,
    pub ta_location_longitude: f64,
    pub ta_location_altitude: f64,
    pub ta_location_time_seconds: i64,
    pub ta_location_time_nano_seconds: u32,
    pub ta_location_speed_mps: f64,
    pub ta_location_orientation_degrees: f64,
}

/// Flat messaging packet: status report, detection and task command sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct MessagingPacket {
    pub message_type: i32,
    pub sr_header_sender_id: String,
    pub sr_header_time_seconds: i64,
    pub sr_header_time_nano_seconds: u32,
    pub sr_location_latitude: f64,
    pub sr_location_longitude: f64,
    pub sr_location_altitude: f64,
    pub sr_location_time_seconds: i64,
    pub sr_location_time_nano_seconds: u32,
    pub sr_location_speed_mps: f64,
    pub sr_location_orientation_degrees: f64,
    pub sr_status_task_status: i32,
    pub sr_status_battery_percentage: f64,
    pub sr_status_signal_strength_dbm: f64,
    pub sr_status_system_error: bool,
    pub cd_header_sender_id: String,
    pub cd_header_time_seconds: i64,
    pub cd_header_time_nano_seconds: u32,
    pub cd_detection_target_ID: String,
    pub cd_detection_target_type: i32,
    pub cd_detection_loc_latitude: f64,
    pub cd_detection_loc_longitude: f64,
    pub cd_detection_loc_altitude: f64,
    pub cd_detection_loc_time_seconds: i64,
    pub cd_detection_loc_time_nano_seconds: u32,
    pub cd_detection_loc_speed_mps: f64,
    pub cd_detection_loc_orientation_degrees: f64,
    pub cd_detection_confidence_level: f64,
    pub cd_detection_description: String,
    pub cd_detection_raw_data_link: String,
    pub tc_header_sender_id: String,
    pub tc_header_time_seconds: i64,
    pub tc_header_time_nano_seconds: u32,
    pub tc_receiver_id: String,
    pub tc_assignment_command: String,
    pub tc_assignment_loc_latitude: f64,
    pub tc_assignment_loc_longitude: f64,
    pub tc_assignment_loc_altitude: f64,
    pub tc_assignment_loc_time_seconds: i64,
    pub tc_assignment_loc_time_nano_seconds: u32,
    pub tc_assignment_loc_speed_mps: f64,
    pub tc_assignment_loc_orientation_degrees: f64,
}

/// One decoded sample of any category.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetrySample {
    CoreData(CoreData),
    Intelligence(Intelligence),
    Messaging(MessagingPacket),
}

impl TelemetrySample {
    /// Projects the sample onto an ordered field map.
    pub fn fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let value = match self {
            TelemetrySample::CoreData(sample) => serde_json::to_value(sample)?,
            TelemetrySample::Intelligence(sample) => serde_json::to_value(sample)?,
            TelemetrySample::Messaging(sample) => serde_json::to_value(sample)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Ok(Map::from_iter([("value".to_string(), other)])),
        }
    }

    /// Short label used in logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            TelemetrySample::CoreData(_) => "CoreData",
            TelemetrySample::Intelligence(_) => "Intelligence",
            TelemetrySample::Messaging(_) => "MessagingPacket",
        }
    }
}

impl From<CoreData> for TelemetrySample {
    fn from(sample: CoreData) -> Self {
        TelemetrySample::CoreData(sample)
    }
}

impl From<Intelligence> for TelemetrySample {
    fn from(sample: Intelligence) -> Self {
        TelemetrySample::Intelligence(sample)
    }
}

impl From<MessagingPacket> for TelemetrySample {
    fn from(sample: MessagingPacket) -> Self {
        TelemetrySample::Messaging(sample)
    }
}
