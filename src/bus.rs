pub mod i2c;
pub mod sim;
pub mod transaction;

use crate::errors::BusResult;
use std::time::Duration;

pub use transaction::{AckPolicy, Direction, Frame, Phase, Transaction, TransactionBuilder};

/// Upper bound for one transaction when nothing else is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Executes built transactions against a two-wire bus.
///
/// `rx` receives the bytes of every read frame in transaction order and must hold exactly
/// [`Transaction::read_len`] bytes. Implementations block until the stop condition has been
/// sent or `timeout` has elapsed, and never retry.
pub trait BusTransport {
    fn execute(&mut self, txn: &Transaction, rx: &mut [u8], timeout: Duration) -> BusResult<()>;
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn execute(&mut self, txn: &Transaction, rx: &mut [u8], timeout: Duration) -> BusResult<()> {
        (**self).execute(txn, rx, timeout)
    }
}

/// Bus type enum for different communication interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    I2C,
    /// In-process simulated MPU6050, no hardware required
    Sim,
}

impl BusType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i2c" => Some(BusType::I2C),
            "sim" => Some(BusType::Sim),
            _ => None,
        }
    }
}
