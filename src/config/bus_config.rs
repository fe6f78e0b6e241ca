use crate::bus::BusType;
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;

/// The `[bus]` section
#[derive(Debug, Clone, Deserialize)]
pub struct BusEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String, // 'type' is a reserved word in Rust, use raw identifier
    /// Device node for `i2c` buses, e.g. `/dev/i2c-1`
    #[serde(default)]
    pub path: String,
}

impl BusEntry {
    pub fn bus_type(&self) -> ConfigResult<BusType> {
        BusType::from_str(&self.r#type).ok_or_else(|| ConfigError::InvalidValue {
            field: "bus.type".to_string(),
            reason: format!("unknown bus type '{}', expected \"i2c\" or \"sim\"", self.r#type),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.bus_type()? == BusType::I2C && self.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bus.path".to_string(),
                reason: "an i2c bus needs a device path".to_string(),
            });
        }
        Ok(())
    }
}
