use super::{BusTransport, Direction, Transaction};
use crate::errors::{BusError, BusResult};
use std::time::Duration;

#[cfg(target_os = "linux")]
use i2cdev::core::{I2CMessage, I2CTransfer};
#[cfg(target_os = "linux")]
use i2cdev::linux::{I2CMessageFlags, LinuxI2CBus, LinuxI2CMessage};
#[cfg(target_os = "linux")]
use std::time::Instant;
#[cfg(target_os = "linux")]
use tracing::{debug, warn};

// errno values reported by the kernel i2c adapters
#[cfg(target_os = "linux")]
const ENXIO: i32 = 6;
#[cfg(target_os = "linux")]
const EREMOTEIO: i32 = 121;
#[cfg(target_os = "linux")]
const ETIMEDOUT: i32 = 110;

/// I2C bus implementation
///
/// Each phase of a transaction becomes one kernel message. The adapter issues a repeated
/// start between messages, a stop after the last one, and NACKs the final byte of every
/// read message.
///
/// Acknowledge requirements are per message: a phase containing any optional-ack write is
/// sent with `IGNORE_NACK`, which also stops the adapter from reporting a NACK on that
/// phase's address byte.
///
/// The configured timeout is checked once `transfer` returns. A stalled adapter blocks for
/// its own kernel timeout (reported as [`BusError::Timeout`]) rather than for `timeout`.
#[cfg(target_os = "linux")]
pub struct I2CBus {
    bus: LinuxI2CBus,
    path: String,
}

#[cfg(not(target_os = "linux"))]
pub struct I2CBus {
    _phantom: std::marker::PhantomData<()>,
}

#[cfg(target_os = "linux")]
impl I2CBus {
    pub fn new(path: &str) -> BusResult<Self> {
        let bus = LinuxI2CBus::new(path)
            .map_err(|e| BusError::Transport(format!("{}: {}", path, e)))?;
        Ok(Self {
            bus,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(target_os = "linux")]
impl BusTransport for I2CBus {
    fn execute(&mut self, txn: &Transaction, rx: &mut [u8], timeout: Duration) -> BusResult<()> {
        txn.check_read_buffer(rx.len())?;

        let phases = txn.phases();
        let mut remaining: &mut [u8] = rx;
        let mut messages = Vec::with_capacity(phases.len());
        for phase in &phases {
            let message = match phase.direction {
                Direction::Write => {
                    let message = LinuxI2CMessage::write(&phase.data);
                    if phase.require_ack {
                        message
                    } else {
                        message.with_flags(I2CMessageFlags::IGNORE_NACK)
                    }
                }
                Direction::Read => {
                    let (slots, rest) = std::mem::take(&mut remaining).split_at_mut(phase.read_len);
                    remaining = rest;
                    LinuxI2CMessage::read(slots)
                }
            };
            messages.push(message.with_address(u16::from(phase.address)));
        }

        let started = Instant::now();
        let result = self.bus.transfer(&mut messages);
        let elapsed = started.elapsed();

        match result {
            Ok(count) => {
                debug!("[i2c] {}: {} message(s) in {:?}", self.path, count, elapsed);
                if elapsed > timeout {
                    warn!("[i2c] {}: transfer took {:?}, limit {:?}", self.path, elapsed, timeout);
                    return Err(BusError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Ok(())
            }
            Err(e) => {
                let err = std::io::Error::from(e);
                match err.raw_os_error() {
                    Some(ETIMEDOUT) => Err(BusError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                    // The kernel does not say which byte went unacknowledged
                    Some(ENXIO) | Some(EREMOTEIO) => Err(BusError::Nack {
                        frame: 1,
                        byte: address_byte(txn),
                    }),
                    _ => Err(BusError::Transport(format!("{}: {}", self.path, err))),
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn address_byte(txn: &Transaction) -> u8 {
    txn.frames()
        .iter()
        .find_map(|f| match f {
            super::Frame::Write { value, .. } => Some(*value),
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
impl I2CBus {
    pub fn new(_path: &str) -> BusResult<Self> {
        Err(BusError::Unsupported(
            "I2C is only supported on Linux. Use a \"sim\" bus on this platform.".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl BusTransport for I2CBus {
    fn execute(&mut self, _txn: &Transaction, _rx: &mut [u8], _timeout: Duration) -> BusResult<()> {
        Err(BusError::Unsupported("I2C is only supported on Linux".to_string()))
    }
}
