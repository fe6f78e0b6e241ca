use serde::{Deserialize, Serialize};

/// Header metadata common to all sensor messages
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Header {
    /// Unique device identifier
    pub device_id: String,
    /// Sensor identifier from the configuration (e.g., "imu0")
    pub sensor_id: String,
    /// Sequence number for message ordering, counts failed samples too
    pub seq: u64,
    /// UTC timestamp in nanoseconds
    pub t_utc_ns: u64,
    /// Message schema version for evolution
    pub schema_v: u16,
}

impl Header {
    /// Create a new header with the current time
    pub fn new(device_id: String, sensor_id: String, seq: u64) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now_utc = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        Self {
            device_id,
            sensor_id,
            seq,
            t_utc_ns: now_utc,
            schema_v: 1,
        }
    }
}

/// One successful sample
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SampleMessage {
    pub h: Header,
    /// Raw X acceleration count (scale depends on ACCEL_CONFIG)
    pub accel_x: i16,
    /// Raw X, Y, Z acceleration counts, when all axes are sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accel: Option<[i16; 3]>,
    /// Die temperature (°C)
    pub temperature: f32,
}

/// A sample that could not be taken
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReadFailureMessage {
    pub h: Header,
    pub reason: String,
    /// Worth retrying on the next period (bus timeout)
    pub transient: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum SensorMessage {
    Sample(SampleMessage),
    ReadFailure(ReadFailureMessage),
}

impl SensorMessage {
    /// Get the header from any sensor message
    pub fn header(&self) -> &Header {
        match self {
            SensorMessage::Sample(msg) => &msg.h,
            SensorMessage::ReadFailure(msg) => &msg.h,
        }
    }

    /// Get the sensor ID from any sensor message
    pub fn sensor_id(&self) -> &str {
        &self.header().sensor_id
    }

    /// Single-line JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Human readable line
    pub fn to_text(&self) -> String {
        match self {
            SensorMessage::Sample(msg) => {
                let mut line = format!("[{}] #{} accel_x={}", msg.h.sensor_id, msg.h.seq, msg.accel_x);
                if let Some([x, y, z]) = msg.accel {
                    line.push_str(&format!(" accel=({}, {}, {})", x, y, z));
                }
                line.push_str(&format!(" temperature={:.2}°C", msg.temperature));
                line
            }
            SensorMessage::ReadFailure(msg) => {
                format!("[{}] #{} read failed: {}", msg.h.sensor_id, msg.h.seq, msg.reason)
            }
        }
    }
}
