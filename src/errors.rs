use crate::sensors::mpu6050::DriverState;
use thiserror::Error;

/// Malformed transaction construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no frame elements")]
    Empty,

    #[error("transaction must begin with a start condition")]
    MissingStart,

    #[error("transaction must end with a stop condition")]
    MissingStop,

    #[error("element {index} follows the stop condition")]
    ElementAfterStop { index: usize },

    #[error("start at element {index} is not followed by an address write")]
    AddressExpected { index: usize },

    #[error("device address {address:#04x} does not fit in 7 bits")]
    InvalidAddress { address: u8 },

    #[error("read at element {index} belongs to a write phase")]
    ReadInWritePhase { index: usize },

    #[error("write at element {index} belongs to a read phase")]
    WriteInReadPhase { index: usize },

    #[error("final read of the burst at element {index} must be NACK")]
    AckOnFinalRead { index: usize },

    #[error("read at element {index} is NACK but more reads follow in the burst")]
    NackBeforeFinalRead { index: usize },

    #[error("read phase addressed at element {index} reads no byte")]
    EmptyReadPhase { index: usize },
}

/// Failures reported by a bus transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus transaction timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no acknowledge for byte {byte:#04x} (element {frame})")]
    Nack { frame: usize, byte: u8 },

    #[error("malformed transaction: {0}")]
    Malformed(#[from] TransactionError),

    #[error("read buffer holds {actual} byte(s) but the transaction reads {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("bus transport failed: {0}")]
    Transport(String),

    #[error("bus not supported: {0}")]
    Unsupported(String),
}

/// Sensor driver errors
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Sensor '{sensor}' not present: expected WHO_AM_I {expected:#04x}, got {actual:#04x}")]
    DeviceNotPresent { sensor: String, expected: u8, actual: u8 },

    #[error("Sensor '{sensor}' bus timeout after {timeout_ms}ms")]
    BusTimeout { sensor: String, timeout_ms: u64 },

    #[error("Sensor '{sensor}' was not acknowledged: {reason}")]
    BusNack { sensor: String, reason: String },

    #[error("Sensor '{sensor}' built a malformed transaction: {source}")]
    Transaction {
        sensor: String,
        #[source]
        source: TransactionError,
    },

    #[error("Sensor '{sensor}' transport failure: {reason}")]
    Transport { sensor: String, reason: String },

    #[error("Sensor '{sensor}' cannot {operation} while {state}")]
    InvalidState {
        sensor: String,
        operation: &'static str,
        state: DriverState,
    },

    #[error("Unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },
}

impl SensorError {
    /// Attach the sensor id to a transport failure, keeping its class
    pub fn from_bus(sensor: &str, error: BusError) -> Self {
        let sensor = sensor.to_string();
        match error {
            BusError::Timeout { timeout_ms } => SensorError::BusTimeout { sensor, timeout_ms },
            e @ BusError::Nack { .. } => SensorError::BusNack {
                sensor,
                reason: e.to_string(),
            },
            BusError::Malformed(source) => SensorError::Transaction { sensor, source },
            e => SensorError::Transport {
                sensor,
                reason: e.to_string(),
            },
        }
    }

    /// Timeouts are the only failures worth retrying without intervention
    pub fn is_transient(&self) -> bool {
        matches!(self, SensorError::BusTimeout { .. })
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Startup errors: anything that keeps the sampling loop from starting
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus '{bus}' could not be opened: {source}")]
    BusOpen {
        bus: String,
        #[source]
        source: BusError,
    },

    #[error("Sensor initialization failed: {0}")]
    Sensor(#[from] SensorError),
}

/// Result type aliases for convenience
pub type BusResult<T> = Result<T, BusError>;
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StartupResult<T> = Result<T, StartupError>;
