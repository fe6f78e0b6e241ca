use crate::bus::transaction::MAX_DEVICE_ADDRESS;
use crate::errors::{ConfigError, ConfigResult};
use crate::sensors::mpu6050::registers::DEFAULT_ADDRESS;
use crate::sensors::mpu6050::RegisterValues;
use serde::Deserialize;

/// The `[sensor]` section
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Id of the bus the sensor hangs off
    pub bus: String,
    #[serde(default = "default_address")]
    pub address: u8,
    /// Upper bound for one bus transaction
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sample Y and Z acceleration as well
    #[serde(default)]
    pub all_axes: bool,
    #[serde(default)]
    pub registers: RegisterValues,
}

fn default_driver() -> String {
    "mpu6050".to_string()
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

fn default_timeout_ms() -> u64 {
    1000
}

impl SensorEntry {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.address > MAX_DEVICE_ADDRESS {
            return Err(ConfigError::InvalidValue {
                field: "sensor.address".to_string(),
                reason: format!("{:#04x} is not a 7-bit address", self.address),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sensor.timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
