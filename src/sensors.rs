use crate::bus::BusTransport;
use crate::config::sensor_config::SensorEntry;
use crate::errors::{SensorError, SensorResult};
use std::time::Duration;

pub mod mpu6050;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SensorDataFrame {
    /// Raw X acceleration count
    pub accel_x: Option<i16>,
    /// Raw X, Y, Z acceleration counts when all axes are sampled
    pub accel: Option<[i16; 3]>,
    /// Degrees Celsius
    pub temp: Option<f32>,
}

/// Blocking sensor driver. Each call owns the bus for its whole duration.
pub trait SensorDriver: Send {
    /// Identity check and configuration; must succeed before `read`
    fn init(&mut self) -> SensorResult<()>;
    fn read(&mut self) -> SensorResult<SensorDataFrame>;
    fn id(&self) -> &str;
    fn bus(&self) -> &str;
}

pub type BoxedTransport = Box<dyn BusTransport + Send>;

pub fn create_sensor_driver(
    entry: &SensorEntry,
    bus: BoxedTransport,
) -> SensorResult<Box<dyn SensorDriver>> {
    match entry.driver.as_str() {
        "mpu6050" => Ok(Box::new(
            mpu6050::Mpu6050::new(entry.id.clone(), entry.address, entry.bus.clone(), bus)
                .with_timeout(Duration::from_millis(entry.timeout_ms))
                .with_registers(entry.registers)
                .with_all_axes(entry.all_axes),
        )),
        _ => Err(SensorError::UnsupportedDriver {
            driver: entry.driver.clone(),
        }),
    }
}
