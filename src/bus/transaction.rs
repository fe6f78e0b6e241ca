//! Two-wire bus transactions.
//!
//! A [`Transaction`] is an ordered list of [`Frame`] elements describing one complete
//! exchange: it opens with a start condition, closes with a stop condition and may switch
//! from a write phase to a read phase through a repeated start. Transactions are only
//! obtainable through [`TransactionBuilder::build`], which rejects malformed sequences, so
//! transports can execute them without re-checking the framing.

use crate::errors::{BusError, BusResult, TransactionError};

/// Highest 7-bit device address
pub const MAX_DEVICE_ADDRESS: u8 = 0x7F;

/// Transfer direction encoded in the low bit of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    pub const fn bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }

    pub const fn from_address_byte(byte: u8) -> Self {
        if byte & 1 == 1 {
            Direction::Read
        } else {
            Direction::Write
        }
    }
}

/// Acknowledge sent by the controller after a byte it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPolicy {
    /// More bytes follow in this read phase
    Ack,
    /// Last byte of this read phase
    Nack,
}

/// One primitive bus operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Start,
    /// Outgoing byte. A missing acknowledge fails the transaction when `require_ack` is set.
    Write { value: u8, require_ack: bool },
    Read { ack: AckPolicy },
    Stop,
}

/// Consecutive frames addressed to one device in one direction, delimited by (repeated) starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// 7-bit device address
    pub address: u8,
    pub direction: Direction,
    /// Payload bytes written after the address byte
    pub data: Vec<u8>,
    /// Number of bytes read in this phase
    pub read_len: usize,
    /// Whether every outgoing byte of the phase, address included, must be acknowledged.
    /// Cleared by a single optional-ack write, since transports acknowledge per phase.
    pub require_ack: bool,
}

/// A validated, immutable bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    frames: Vec<Frame>,
}

impl Transaction {
    /// Opens a new, empty transaction
    pub fn begin() -> TransactionBuilder {
        TransactionBuilder::default()
    }

    /// `S | addr+W | register | value | P`
    pub fn write_register(address: u8, register: u8, value: u8) -> Result<Self, TransactionError> {
        Self::begin()
            .start()
            .address(address, Direction::Write)
            .write_byte(register, true)
            .write_byte(value, true)
            .stop()
            .build()
    }

    /// `S | addr+W | register | Sr | addr+R | data (ACK)... | data (NACK) | P`
    pub fn read_registers(address: u8, register: u8, len: usize) -> Result<Self, TransactionError> {
        Self::begin()
            .start()
            .address(address, Direction::Write)
            .write_byte(register, true)
            .start()
            .address(address, Direction::Read)
            .read_burst(len)
            .stop()
            .build()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Total number of bytes read across all read phases
    pub fn read_len(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| matches!(f, Frame::Read { .. }))
            .count()
    }

    /// Checks that a receive buffer has exactly one slot per read frame
    pub fn check_read_buffer(&self, len: usize) -> BusResult<()> {
        let expected = self.read_len();
        if len != expected {
            return Err(BusError::BufferLength { expected, actual: len });
        }
        Ok(())
    }

    /// Splits the transaction into its address phases
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = Vec::new();
        let mut expecting_address = false;

        for frame in &self.frames {
            match *frame {
                Frame::Start => expecting_address = true,
                Frame::Write { value, require_ack } if expecting_address => {
                    expecting_address = false;
                    phases.push(Phase {
                        address: value >> 1,
                        direction: Direction::from_address_byte(value),
                        data: Vec::new(),
                        read_len: 0,
                        require_ack,
                    });
                }
                Frame::Write { value, require_ack } => {
                    if let Some(phase) = phases.last_mut() {
                        phase.data.push(value);
                        phase.require_ack &= require_ack;
                    }
                }
                Frame::Read { .. } => {
                    if let Some(phase) = phases.last_mut() {
                        phase.read_len += 1;
                    }
                }
                Frame::Stop => {}
            }
        }

        phases
    }
}

/// Assembles frame elements into a [`Transaction`]
///
/// Builder calls never fail on their own; the first problem is remembered and reported
/// by [`build`](Self::build).
#[derive(Debug, Default)]
#[must_use]
pub struct TransactionBuilder {
    frames: Vec<Frame>,
    error: Option<TransactionError>,
}

impl TransactionBuilder {
    /// Appends a start (or repeated start) condition
    pub fn start(mut self) -> Self {
        self.frames.push(Frame::Start);
        self
    }

    /// Appends the address byte `(address << 1) | direction`, which must be acknowledged
    pub fn address(mut self, address: u8, direction: Direction) -> Self {
        if address > MAX_DEVICE_ADDRESS {
            self.error.get_or_insert(TransactionError::InvalidAddress { address });
            return self;
        }
        self.write_byte((address << 1) | direction.bit(), true)
    }

    pub fn write_byte(mut self, value: u8, require_ack: bool) -> Self {
        self.frames.push(Frame::Write { value, require_ack });
        self
    }

    pub fn read_byte(mut self, ack: AckPolicy) -> Self {
        self.frames.push(Frame::Read { ack });
        self
    }

    /// Appends `len` reads: ACK on all but the last, NACK on the last
    pub fn read_burst(mut self, len: usize) -> Self {
        for i in 0..len {
            let ack = if i + 1 == len { AckPolicy::Nack } else { AckPolicy::Ack };
            self = self.read_byte(ack);
        }
        self
    }

    pub fn stop(mut self) -> Self {
        self.frames.push(Frame::Stop);
        self
    }

    /// Validates the framing and yields the transaction
    pub fn build(self) -> Result<Transaction, TransactionError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        validate(&self.frames)?;
        Ok(Transaction { frames: self.frames })
    }
}

fn validate(frames: &[Frame]) -> Result<(), TransactionError> {
    let last = match frames.len() {
        0 => return Err(TransactionError::Empty),
        n => n - 1,
    };
    if frames[0] != Frame::Start {
        return Err(TransactionError::MissingStart);
    }
    if let Some(stop) = frames.iter().position(|f| *f == Frame::Stop) {
        if stop != last {
            return Err(TransactionError::ElementAfterStop { index: stop + 1 });
        }
    } else {
        return Err(TransactionError::MissingStop);
    }

    let mut direction = Direction::Write;
    // Index of the address byte opening the current phase
    let mut phase_address = 0;
    // Index of the start whose address byte is still outstanding
    let mut pending_start: Option<usize> = None;
    // Most recent read of the current phase
    let mut last_read: Option<(usize, AckPolicy)> = None;

    for (index, frame) in frames.iter().enumerate() {
        match *frame {
            Frame::Start | Frame::Stop => {
                if let Some(start) = pending_start {
                    return Err(TransactionError::AddressExpected { index: start });
                }
                match last_read {
                    Some((read, AckPolicy::Ack)) => {
                        return Err(TransactionError::AckOnFinalRead { index: read })
                    }
                    None if direction == Direction::Read => {
                        return Err(TransactionError::EmptyReadPhase { index: phase_address })
                    }
                    _ => {}
                }
                last_read = None;
                if *frame == Frame::Start {
                    pending_start = Some(index);
                }
            }
            Frame::Write { value, .. } => {
                if pending_start.take().is_some() {
                    phase_address = index;
                    direction = Direction::from_address_byte(value);
                } else if direction == Direction::Read {
                    return Err(TransactionError::WriteInReadPhase { index });
                }
            }
            Frame::Read { ack } => {
                if let Some(start) = pending_start {
                    return Err(TransactionError::AddressExpected { index: start });
                }
                if direction == Direction::Write {
                    return Err(TransactionError::ReadInWritePhase { index });
                }
                if let Some((read, AckPolicy::Nack)) = last_read {
                    return Err(TransactionError::NackBeforeFinalRead { index: read });
                }
                last_read = Some((index, ack));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: u8 = 0x68;

    fn assert_framed(txn: &Transaction) {
        assert_eq!(txn.frames().first(), Some(&Frame::Start));
        assert_eq!(txn.frames().last(), Some(&Frame::Stop));
    }

    #[test]
    fn test_write_register_frames() {
        let txn = Transaction::write_register(DEV, 0x6B, 0x00).unwrap();
        assert_framed(&txn);
        assert_eq!(
            txn.frames(),
            &[
                Frame::Start,
                Frame::Write { value: 0xD0, require_ack: true },
                Frame::Write { value: 0x6B, require_ack: true },
                Frame::Write { value: 0x00, require_ack: true },
                Frame::Stop,
            ]
        );
        assert_eq!(txn.read_len(), 0);
    }

    #[test]
    fn test_read_registers_uses_repeated_start() {
        let txn = Transaction::read_registers(DEV, 0x3B, 2).unwrap();
        assert_framed(&txn);
        assert_eq!(
            txn.frames(),
            &[
                Frame::Start,
                Frame::Write { value: 0xD0, require_ack: true },
                Frame::Write { value: 0x3B, require_ack: true },
                Frame::Start,
                Frame::Write { value: 0xD1, require_ack: true },
                Frame::Read { ack: AckPolicy::Ack },
                Frame::Read { ack: AckPolicy::Nack },
                Frame::Stop,
            ]
        );
    }

    #[test]
    fn test_read_burst_nacks_only_the_last_byte() {
        for len in 1..=8 {
            let txn = Transaction::read_registers(DEV, 0x3B, len).unwrap();
            assert_framed(&txn);
            let acks: Vec<AckPolicy> = txn
                .frames()
                .iter()
                .filter_map(|f| match f {
                    Frame::Read { ack } => Some(*ack),
                    _ => None,
                })
                .collect();
            assert_eq!(acks.len(), len);
            assert!(acks[..len - 1].iter().all(|a| *a == AckPolicy::Ack));
            assert_eq!(acks[len - 1], AckPolicy::Nack);
        }
    }

    #[test]
    fn test_phases() {
        let txn = Transaction::read_registers(DEV, 0x41, 2).unwrap();
        let phases = txn.phases();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].address, DEV);
        assert_eq!(phases[0].direction, Direction::Write);
        assert_eq!(phases[0].data, vec![0x41]);
        assert_eq!(phases[1].direction, Direction::Read);
        assert_eq!(phases[1].read_len, 2);
        assert!(phases.iter().all(|p| p.require_ack));
    }

    #[test]
    fn test_optional_ack_clears_phase_requirement() {
        let txn = Transaction::begin()
            .start()
            .address(DEV, Direction::Write)
            .write_byte(0x6B, false)
            .stop()
            .build()
            .unwrap();
        assert!(!txn.phases()[0].require_ack);
    }

    #[test]
    fn test_missing_stop_is_rejected() {
        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Write)
            .write_byte(0x75, true)
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::MissingStop);
    }

    #[test]
    fn test_missing_start_is_rejected() {
        let err = Transaction::begin()
            .read_byte(AckPolicy::Nack)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::MissingStart);
        assert_eq!(Transaction::begin().build().unwrap_err(), TransactionError::Empty);
    }

    #[test]
    fn test_element_after_stop_is_rejected() {
        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Write)
            .stop()
            .start()
            .address(DEV, Direction::Write)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::ElementAfterStop { index: 3 });
    }

    #[test]
    fn test_start_requires_address() {
        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Write)
            .write_byte(0x3B, true)
            .start()
            .read_byte(AckPolicy::Nack)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::AddressExpected { index: 3 });

        let err = Transaction::begin().start().stop().build().unwrap_err();
        assert_eq!(err, TransactionError::AddressExpected { index: 0 });
    }

    #[test]
    fn test_direction_mismatch_is_rejected() {
        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Write)
            .read_byte(AckPolicy::Nack)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::ReadInWritePhase { index: 2 });

        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Read)
            .write_byte(0x00, true)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::WriteInReadPhase { index: 2 });
    }

    #[test]
    fn test_ack_policy_of_burst_is_enforced() {
        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Read)
            .read_byte(AckPolicy::Ack)
            .read_byte(AckPolicy::Ack)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::AckOnFinalRead { index: 3 });

        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Read)
            .read_byte(AckPolicy::Nack)
            .read_byte(AckPolicy::Nack)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::NackBeforeFinalRead { index: 2 });
    }

    #[test]
    fn test_read_phase_needs_a_read() {
        let err = Transaction::read_registers(DEV, 0x3B, 0).unwrap_err();
        assert_eq!(err, TransactionError::EmptyReadPhase { index: 4 });

        let err = Transaction::begin()
            .start()
            .address(DEV, Direction::Read)
            .start()
            .address(DEV, Direction::Write)
            .write_byte(0x6B, true)
            .stop()
            .build()
            .unwrap_err();
        assert_eq!(err, TransactionError::EmptyReadPhase { index: 1 });
    }

    #[test]
    fn test_address_out_of_range() {
        let err = Transaction::write_register(0x80, 0x6B, 0x00).unwrap_err();
        assert_eq!(err, TransactionError::InvalidAddress { address: 0x80 });
    }

    #[test]
    fn test_read_buffer_length() {
        let txn = Transaction::read_registers(DEV, 0x3B, 6).unwrap();
        assert!(txn.check_read_buffer(6).is_ok());
        assert_eq!(
            txn.check_read_buffer(2),
            Err(BusError::BufferLength { expected: 6, actual: 2 })
        );
    }
}
