pub mod bus_config;
pub mod sampling_config;
pub mod sensor_config;

pub use bus_config::BusEntry;
pub use sampling_config::{OutputFormat, SamplingEntry};
pub use sensor_config::SensorEntry;

use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// File name looked up inside the configuration directory
pub const CONFIG_FILE: &str = "sensorhub.toml";

/// Root of `sensorhub.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    pub bus: BusEntry,
    pub sensor: SensorEntry,
    #[serde(default)]
    pub sampling: SamplingEntry,
}

impl HubConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.bus.validate()?;
        self.sensor.validate()?;
        self.sampling.validate()?;
        if self.sensor.bus != self.bus.id {
            return Err(ConfigError::InvalidValue {
                field: "sensor.bus".to_string(),
                reason: format!("no bus with id '{}'", self.sensor.bus),
            });
        }
        Ok(())
    }
}

/// Parses and validates a configuration document
pub fn parse_config(content: &str) -> ConfigResult<HubConfig> {
    let config: HubConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Loads config from TOML file
pub fn load_config(path: &str) -> ConfigResult<HubConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Configuration directory from CONFIG_PATH, `config` when unset
pub fn config_dir() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusType;

    const MINIMAL: &str = r#"
        [bus]
        id = "sim0"
        type = "sim"

        [sensor]
        id = "imu0"
        bus = "sim0"
    "#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.bus.bus_type().unwrap(), BusType::Sim);
        assert_eq!(config.sensor.driver, "mpu6050");
        assert_eq!(config.sensor.address, 0x68);
        assert_eq!(config.sensor.timeout_ms, 1000);
        assert!(!config.sensor.all_axes);
        assert_eq!(config.sensor.registers.sample_rate_divider, 0x07);
        assert_eq!(config.sampling.period_ms, 1000);
        assert_eq!(config.sampling.startup_delay_ms, 100);
        assert_eq!(config.sampling.format, OutputFormat::Text);
        assert_eq!(config.sampling.max_samples, None);
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            [bus]
            id = "i2c1"
            type = "i2c"
            path = "/dev/i2c-1"

            [sensor]
            id = "imu0"
            bus = "i2c1"
            address = 0x69
            timeout_ms = 250
            all_axes = true

            [sensor.registers]
            accel_config = 0x10

            [sampling]
            period_ms = 20
            format = "json"
            max_samples = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.bus.path, "/dev/i2c-1");
        assert_eq!(config.sensor.address, 0x69);
        assert_eq!(config.sensor.timeout_ms, 250);
        assert_eq!(config.sensor.registers.accel_config, 0x10);
        assert_eq!(config.sensor.registers.power_management, 0x00);
        assert_eq!(config.sampling.format, OutputFormat::Json);
        assert_eq!(config.sampling.max_samples, Some(5));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = parse_config(include_str!("../config/sensorhub.toml")).unwrap();
        assert_eq!(config.bus.bus_type().unwrap(), BusType::I2C);
        assert_eq!(config.sensor.registers, Default::default());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            (MINIMAL.replace("\"sim\"", "\"spi\""), "bus.type"),
            (MINIMAL.replace("\"sim\"", "\"i2c\""), "bus.path"),
            (format!("{}address = 0x80\n", MINIMAL), "sensor.address"),
            (format!("{}timeout_ms = 0\n", MINIMAL), "sensor.timeout_ms"),
            (format!("{}[sampling]\nperiod_ms = 0\n", MINIMAL), "sampling.period_ms"),
            (MINIMAL.replace("bus = \"sim0\"", "bus = \"i2c9\""), "sensor.bus"),
        ];
        for (content, expected) in cases {
            match parse_config(&content) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {} to be rejected, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_format_errors() {
        assert!(matches!(parse_config("[bus]\nid = 3\n"), Err(ConfigError::FormatError(_))));
        assert!(matches!(
            load_config("/nonexistent/sensorhub.toml"),
            Err(ConfigError::LoadError { .. })
        ));
    }
}
