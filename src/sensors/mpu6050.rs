pub mod registers;

use self::registers::*;
use super::{SensorDataFrame, SensorDriver};
use crate::bus::{BusTransport, Transaction, DEFAULT_TIMEOUT};
use crate::errors::{SensorError, SensorResult};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

// Datasheet temperature transform: degC = raw / 340 + 36.53
const TEMP_SENSITIVITY: f64 = 340.0; // LSB/°C
const TEMP_OFFSET: f64 = 36.53; // °C

/// Assembles a big-endian register pair into a signed count
pub const fn decode_raw(high: u8, low: u8) -> i16 {
    (((high as u16) << 8) | low as u16) as i16
}

/// Splits a signed count into its (high, low) register bytes
pub const fn encode_raw(raw: i16) -> [u8; 2] {
    let value = raw as u16;
    [(value >> 8) as u8, value as u8]
}

pub fn temperature_celsius(raw: i16) -> f32 {
    (f64::from(raw) / TEMP_SENSITIVITY + TEMP_OFFSET) as f32
}

/// Initialization progress of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    IdentityVerified,
    Configured,
    Sampling,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Uninitialized => "uninitialized",
            DriverState::IdentityVerified => "identity verified",
            DriverState::Configured => "configured",
            DriverState::Sampling => "sampling",
        };
        f.write_str(name)
    }
}

/// Values written to the configuration registers, in write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisterValues {
    pub power_management: u8,
    pub sample_rate_divider: u8,
    pub dlpf_config: u8,
    pub gyro_config: u8,
    pub accel_config: u8,
}

impl Default for RegisterValues {
    fn default() -> Self {
        Self {
            power_management: PWR_MGMT_1_AWAKE,
            sample_rate_divider: SMPLRT_DIV_DEFAULT,
            dlpf_config: CONFIG_DEFAULT,
            gyro_config: GYRO_CONFIG_DEFAULT,
            accel_config: ACCEL_CONFIG_DEFAULT,
        }
    }
}

impl RegisterValues {
    /// PWR_MGMT_1 leads: a sleeping device may ignore every other write
    fn writes(&self) -> [(Register, u8); 5] {
        [
            (Register::PwrMgmt1, self.power_management),
            (Register::SmplrtDiv, self.sample_rate_divider),
            (Register::Config, self.dlpf_config),
            (Register::GyroConfig, self.gyro_config),
            (Register::AccelConfig, self.accel_config),
        ]
    }
}

/// MPU6050 accelerometer/temperature driver
///
/// Every operation builds its transactions locally, executes them with a bounded timeout
/// and drops them. Nothing is retried: bus failures and identity mismatches go straight
/// back to the caller.
pub struct Mpu6050<B> {
    id: String,
    address: u8,
    bus_id: String,
    bus: B,
    timeout: Duration,
    registers: RegisterValues,
    all_axes: bool,
    state: DriverState,
}

impl<B: BusTransport> Mpu6050<B> {
    pub fn new(id: String, address: u8, bus_id: String, bus: B) -> Self {
        Self {
            id,
            address,
            bus_id,
            bus,
            timeout: DEFAULT_TIMEOUT,
            registers: RegisterValues::default(),
            all_axes: false,
            state: DriverState::Uninitialized,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_registers(mut self, registers: RegisterValues) -> Self {
        self.registers = registers;
        self
    }

    /// Sample all three acceleration axes in [`SensorDriver::read`] instead of X only
    pub fn with_all_axes(mut self, all_axes: bool) -> Self {
        self.all_axes = all_axes;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn transport(&self) -> &B {
        &self.bus
    }

    pub fn transport_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Gives the bus back
    pub fn release(self) -> B {
        self.bus
    }

    /// Reads WHO_AM_I and checks it against 0x68
    pub fn verify_identity(&mut self) -> SensorResult<()> {
        let mut buf = [0u8; 1];
        self.read_registers(Register::WhoAmI, &mut buf)?;

        if buf[0] != WHO_AM_I_VALUE {
            error!("[{}] MPU6050 not present ({:#04x})", self.id, buf[0]);
            self.state = DriverState::Uninitialized;
            return Err(SensorError::DeviceNotPresent {
                sensor: self.id.clone(),
                expected: WHO_AM_I_VALUE,
                actual: buf[0],
            });
        }

        info!("[{}] MPU6050 detected at {:#04x}", self.id, self.address);
        if self.state == DriverState::Uninitialized {
            self.state = DriverState::IdentityVerified;
        }
        Ok(())
    }

    /// Writes the configuration registers, one transaction each, power management first
    pub fn configure(&mut self) -> SensorResult<()> {
        if self.state == DriverState::Uninitialized {
            return Err(self.invalid_state("configure"));
        }

        for (register, value) in self.registers.writes() {
            self.write_register(register, value)?;
        }

        info!("[{}] MPU6050 configured", self.id);
        self.state = DriverState::Configured;
        Ok(())
    }

    /// Verifies identity, then configures
    pub fn init(&mut self) -> SensorResult<()> {
        self.verify_identity()?;
        self.configure()
    }

    /// Raw X acceleration count
    pub fn read_acceleration_x(&mut self) -> SensorResult<i16> {
        self.read_word("read acceleration", Register::AccelXoutH)
    }

    /// Raw X, Y and Z acceleration counts from one burst
    pub fn read_acceleration(&mut self) -> SensorResult<[i16; 3]> {
        self.require_configured("read acceleration")?;
        let mut buf = [0u8; 6];
        self.read_registers(Register::AccelXoutH, &mut buf)?;
        self.state = DriverState::Sampling;
        Ok([
            decode_raw(buf[0], buf[1]),
            decode_raw(buf[2], buf[3]),
            decode_raw(buf[4], buf[5]),
        ])
    }

    /// Die temperature in degrees Celsius
    pub fn read_temperature(&mut self) -> SensorResult<f32> {
        let raw = self.read_word("read temperature", Register::TempOutH)?;
        Ok(temperature_celsius(raw))
    }

    fn read_word(&mut self, operation: &'static str, register: Register) -> SensorResult<i16> {
        self.require_configured(operation)?;
        let mut buf = [0u8; 2];
        self.read_registers(register, &mut buf)?;
        self.state = DriverState::Sampling;
        Ok(decode_raw(buf[0], buf[1]))
    }

    fn read_registers(&mut self, register: Register, buf: &mut [u8]) -> SensorResult<()> {
        let txn = Transaction::read_registers(self.address, register.addr(), buf.len())
            .map_err(|source| SensorError::Transaction {
                sensor: self.id.clone(),
                source,
            })?;
        self.bus
            .execute(&txn, buf, self.timeout)
            .map_err(|e| SensorError::from_bus(&self.id, e))
    }

    fn write_register(&mut self, register: Register, value: u8) -> SensorResult<()> {
        debug!("[{}] {:?} <- {:#04x}", self.id, register, value);
        let txn = Transaction::write_register(self.address, register.addr(), value)
            .map_err(|source| SensorError::Transaction {
                sensor: self.id.clone(),
                source,
            })?;
        self.bus
            .execute(&txn, &mut [], self.timeout)
            .map_err(|e| SensorError::from_bus(&self.id, e))
    }

    fn require_configured(&self, operation: &'static str) -> SensorResult<()> {
        match self.state {
            DriverState::Configured | DriverState::Sampling => Ok(()),
            _ => Err(self.invalid_state(operation)),
        }
    }

    fn invalid_state(&self, operation: &'static str) -> SensorError {
        SensorError::InvalidState {
            sensor: self.id.clone(),
            operation,
            state: self.state,
        }
    }
}

impl<B: BusTransport + Send> SensorDriver for Mpu6050<B> {
    fn init(&mut self) -> SensorResult<()> {
        Mpu6050::init(self)
    }

    fn read(&mut self) -> SensorResult<SensorDataFrame> {
        let mut frame = SensorDataFrame::default();

        if self.all_axes {
            let accel = self.read_acceleration()?;
            frame.accel_x = Some(accel[0]);
            frame.accel = Some(accel);
        } else {
            frame.accel_x = Some(self.read_acceleration_x()?);
        }
        frame.temp = Some(self.read_temperature()?);

        Ok(frame)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn bus(&self) -> &str {
        &self.bus_id
    }
}
