use crate::bus::i2c::I2CBus;
use crate::bus::sim::SimulatedMpu6050;
use crate::bus::BusType;
use crate::config::HubConfig;
use crate::errors::{StartupError, StartupResult};
use crate::sensors::{create_sensor_driver, BoxedTransport, SensorDriver};
use tracing::info;

// Resting readings of the simulated device: flat on a table at room temperature
const SIM_ACCEL_RAW: [i16; 3] = [0, 0, 16384];
const SIM_TEMPERATURE_RAW: i16 = -3920;

/// Opens the configured bus
pub fn open_bus(config: &HubConfig) -> StartupResult<BoxedTransport> {
    let bus = &config.bus;
    match bus.bus_type()? {
        BusType::I2C => {
            let i2c = I2CBus::new(&bus.path).map_err(|source| StartupError::BusOpen {
                bus: bus.id.clone(),
                source,
            })?;
            info!("[registry] opened i2c bus '{}' at {}", bus.id, bus.path);
            Ok(Box::new(i2c))
        }
        BusType::Sim => {
            let mut sim = SimulatedMpu6050::new(config.sensor.address);
            sim.set_accel_raw(SIM_ACCEL_RAW);
            sim.set_temperature_raw(SIM_TEMPERATURE_RAW);
            info!("[registry] using simulated bus '{}'", bus.id);
            Ok(Box::new(sim))
        }
    }
}

/// Creates the sensor and runs its identity check and configuration.
///
/// Any failure here is fatal: sampling must not start against an unverified device.
pub fn init_sensor(config: &HubConfig) -> StartupResult<Box<dyn SensorDriver>> {
    let transport = open_bus(config)?;
    init_sensor_on(config, transport)
}

/// Same as [`init_sensor`] on an already opened transport
pub fn init_sensor_on(
    config: &HubConfig,
    transport: BoxedTransport,
) -> StartupResult<Box<dyn SensorDriver>> {
    let entry = &config.sensor;
    let mut sensor = create_sensor_driver(entry, transport)?;
    info!(
        "[registry] registering sensor: id={} driver={} bus={} address={:#04x}",
        entry.id, entry.driver, entry.bus, entry.address
    );
    sensor.init()?;
    Ok(sensor)
}
