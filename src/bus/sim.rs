//! Simulated MPU6050 behind a [`BusTransport`].
//!
//! The device keeps a register file and a register pointer like the real part: the first
//! byte written after the address selects a register, further written bytes are stored
//! with auto-increment, and reads return consecutive registers from the pointer. While the
//! sleep bit of PWR_MGMT_1 is set, writes to any other register are dropped.

use super::{BusTransport, Direction, Frame, Transaction};
use crate::errors::{BusError, BusResult};
use crate::sensors::mpu6050::registers::{
    Register, DEFAULT_ADDRESS, PWR_MGMT_1_RESET, PWR_MGMT_1_SLEEP, WHO_AM_I_VALUE,
};
use crate::sensors::mpu6050::encode_raw;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

const REGISTER_COUNT: usize = 128;

/// Failure to report on the next executed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    Timeout,
    /// The device does not acknowledge its address
    Nack,
}

#[derive(Debug, Clone)]
pub struct SimulatedMpu6050 {
    address: u8,
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    faults: VecDeque<BusFault>,
    recording: bool,
    log: Vec<Transaction>,
}

impl Default for SimulatedMpu6050 {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl SimulatedMpu6050 {
    /// Device at `address` in its power-on state: asleep, WHO_AM_I = 0x68
    pub fn new(address: u8) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        registers[Register::WhoAmI.index()] = WHO_AM_I_VALUE;
        registers[Register::PwrMgmt1.index()] = PWR_MGMT_1_RESET;
        Self {
            address,
            registers,
            pointer: 0,
            faults: VecDeque::new(),
            recording: false,
            log: Vec::new(),
        }
    }

    /// Replaces the identity byte, e.g. to model a different part on the bus
    pub fn with_who_am_i(mut self, value: u8) -> Self {
        self.registers[Register::WhoAmI.index()] = value;
        self
    }

    /// Keeps a copy of every executed transaction, see [`transactions`](Self::transactions)
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn register(&self, register: Register) -> u8 {
        self.registers[register.index()]
    }

    /// Sets a register directly, bypassing the bus
    pub fn set_register(&mut self, register: Register, value: u8) {
        self.registers[register.index()] = value;
    }

    pub fn set_accel_raw(&mut self, raw: [i16; 3]) {
        let mut index = Register::AccelXoutH.index();
        for axis in raw {
            let [high, low] = encode_raw(axis);
            self.registers[index] = high;
            self.registers[index + 1] = low;
            index += 2;
        }
    }

    pub fn set_temperature_raw(&mut self, raw: i16) {
        let [high, low] = encode_raw(raw);
        self.registers[Register::TempOutH.index()] = high;
        self.registers[Register::TempOutL.index()] = low;
    }

    pub fn is_sleeping(&self) -> bool {
        self.register(Register::PwrMgmt1) & PWR_MGMT_1_SLEEP != 0
    }

    /// Queues a failure for the next executed transaction
    pub fn inject_fault(&mut self, fault: BusFault) {
        self.faults.push_back(fault);
    }

    /// Every transaction executed while recording, faulted ones included
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    pub fn clear_transactions(&mut self) {
        self.log.clear();
    }

    fn store(&mut self, register: u8, value: u8) {
        let index = usize::from(register) % REGISTER_COUNT;
        if index == Register::WhoAmI.index() {
            return;
        }
        if self.is_sleeping() && index != Register::PwrMgmt1.index() {
            debug!("[sim] asleep, dropping write {:#04x} -> {:#04x}", value, register);
            return;
        }
        self.registers[index] = value;
    }

    fn load(&mut self) -> u8 {
        let value = self.registers[usize::from(self.pointer) % REGISTER_COUNT];
        self.advance();
        value
    }

    fn advance(&mut self) {
        self.pointer = self.pointer.wrapping_add(1) % REGISTER_COUNT as u8;
    }
}

impl BusTransport for SimulatedMpu6050 {
    fn execute(&mut self, txn: &Transaction, rx: &mut [u8], timeout: Duration) -> BusResult<()> {
        txn.check_read_buffer(rx.len())?;
        if self.recording {
            self.log.push(txn.clone());
        }

        let mut frames = txn.frames().iter().enumerate();
        if let Some(fault) = self.faults.pop_front() {
            return match fault {
                BusFault::Timeout => Err(BusError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
                BusFault::Nack => {
                    let (frame, byte) = frames
                        .find_map(|(i, f)| match f {
                            Frame::Write { value, .. } => Some((i, *value)),
                            _ => None,
                        })
                        .unwrap_or_default();
                    Err(BusError::Nack { frame, byte })
                }
            };
        }

        let mut expecting_address = false;
        let mut selected = false;
        let mut register_selected = false;
        let mut slot = 0;

        for (index, frame) in frames {
            match *frame {
                Frame::Start => expecting_address = true,
                Frame::Write { value, require_ack } => {
                    if expecting_address {
                        expecting_address = false;
                        selected = value >> 1 == self.address;
                        register_selected = Direction::from_address_byte(value) == Direction::Read;
                    } else if selected && !register_selected {
                        self.pointer = value % REGISTER_COUNT as u8;
                        register_selected = true;
                    } else if selected {
                        self.store(self.pointer, value);
                        self.advance();
                    }
                    // Nobody drives the acknowledge bit for an unselected device
                    if !selected && require_ack {
                        return Err(BusError::Nack { frame: index, byte: value });
                    }
                }
                Frame::Read { .. } => {
                    // An idle bus reads back as all ones
                    rx[slot] = if selected { self.load() } else { 0xFF };
                    slot += 1;
                }
                Frame::Stop => {}
            }
        }

        Ok(())
    }
}
