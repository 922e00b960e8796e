//! Report frame wire format shared by the firmware and the host tooling.
//!
//! One report goes out per supervisory cycle:
//!
//! | Offset | Field   | Encoding                                          |
//! |--------|---------|---------------------------------------------------|
//! | 0      | marker  | ASCII `'R'`                                       |
//! | 1..5   | counter | little-endian u32                                 |
//! | 5      | status  | bits 0-3 = CAN, SPI, GPIO, WATCHDOG (1 = error),  |
//! |        |         | bits 4-7 reserved, always 0                       |
//!
//! Early firmware revisions framed reports as 3 ASCII bytes
//! `['F', status + 'A', '\n']` with no counter. That layout is superseded
//! and must not appear on the same link as this one.

use core::fmt;

pub const REPORT_MARKER: u8 = b'R';
pub const REPORT_LEN: usize = 6;

const COUNTER_OFFSET: usize = 1;
const STATUS_OFFSET: usize = 5;

pub const CAN_MASK: u8 = 1 << 0;
pub const SPI_MASK: u8 = 1 << 1;
pub const GPIO_MASK: u8 = 1 << 2;
pub const WATCHDOG_MASK: u8 = 1 << 3;
const RESERVED_MASK: u8 = 0xf0;

/// Result of one probe call. There is nothing richer by design: a failed
/// probe is one status bit for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Normal,
    Error,
}

impl Outcome {
    pub fn is_error(self) -> bool {
        matches!(self, Outcome::Error)
    }
}

/// Latest pass/fail state of every monitored subsystem, packed into one
/// byte. Each flag is overwritten every cycle; nothing accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusWord(u8);

impl StatusWord {
    pub const fn all_normal() -> Self {
        Self(0)
    }

    /// State before the first full cycle: the watchdog has not been
    /// serviced yet, so its flag starts raised.
    pub const fn at_boot() -> Self {
        Self(WATCHDOG_MASK)
    }

    /// Accepts only bytes with the reserved bits clear.
    pub fn from_raw(raw: u8) -> Option<Self> {
        (raw & RESERVED_MASK == 0).then_some(Self(raw))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn has_errors(self) -> bool {
        self.0 != 0
    }

    fn set(&mut self, mask: u8, outcome: Outcome) {
        if outcome.is_error() {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    fn flag(self, mask: u8) -> Outcome {
        if self.0 & mask != 0 {
            Outcome::Error
        } else {
            Outcome::Normal
        }
    }

    pub fn set_can(&mut self, outcome: Outcome) {
        self.set(CAN_MASK, outcome);
    }

    pub fn set_spi(&mut self, outcome: Outcome) {
        self.set(SPI_MASK, outcome);
    }

    pub fn set_gpio(&mut self, outcome: Outcome) {
        self.set(GPIO_MASK, outcome);
    }

    pub fn set_watchdog(&mut self, outcome: Outcome) {
        self.set(WATCHDOG_MASK, outcome);
    }

    pub fn can(self) -> Outcome {
        self.flag(CAN_MASK)
    }

    pub fn spi(self) -> Outcome {
        self.flag(SPI_MASK)
    }

    pub fn gpio(self) -> Outcome {
        self.flag(GPIO_MASK)
    }

    pub fn watchdog(self) -> Outcome {
        self.flag(WATCHDOG_MASK)
    }
}

/// Sequence counter carried in every report. Wraps silently; it is a
/// liveness signal for the receiver, not a message id with gap semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter(u32);

impl FrameCounter {
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn advance(&mut self) {
        (self.0, _) = self.0.overflowing_add(1);
    }
}

/// One decoded (or to-be-encoded) report frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    pub counter: u32,
    pub status: StatusWord,
}

impl Report {
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut frame = [0; REPORT_LEN];
        frame[0] = REPORT_MARKER;
        frame[COUNTER_OFFSET..COUNTER_OFFSET + 4].copy_from_slice(&self.counter.to_le_bytes());
        frame[STATUS_OFFSET] = self.status.raw();
        frame
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ReportError> {
        if buf.len() < REPORT_LEN {
            return Err(ReportError::Truncated);
        }
        if buf[0] != REPORT_MARKER {
            return Err(ReportError::BadMarker(buf[0]));
        }
        let counter = u32::from_le_bytes(
            buf[COUNTER_OFFSET..COUNTER_OFFSET + 4]
                .try_into()
                .unwrap(),
        );
        let status = StatusWord::from_raw(buf[STATUS_OFFSET])
            .ok_or(ReportError::ReservedBits(buf[STATUS_OFFSET]))?;
        Ok(Self { counter, status })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError {
    Truncated,
    BadMarker(u8),
    ReservedBits(u8),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Truncated => write!(f, "frame shorter than {REPORT_LEN} bytes"),
            ReportError::BadMarker(byte) => write!(f, "marker byte {byte:#04x} is not 'R'"),
            ReportError::ReservedBits(byte) => {
                write!(f, "status byte {byte:#04x} has reserved bits set")
            }
        }
    }
}

impl core::error::Error for ReportError {}
