use core::num::{NonZeroU8, NonZeroU16};

use fdcan::{
    ConfigMode, FdCan, Instance, InternalLoopbackMode,
    config::{FrameTransmissionConfig, Interrupt, NominalBitTiming},
    filter::{ExtendedFilter, ExtendedFilterSlot, StandardFilter, StandardFilterSlot},
    frame::{FrameFormat, TxFrameHeader},
    id::{Id, StandardId},
};
use num_enum::TryFromPrimitive;
use open_bist_common::report::Outcome;

/// Standard identifier of the loopback test frame.
const TEST_FRAME_ID: u16 = 0x469;
pub(crate) const TEST_PAYLOAD_LEN: usize = 8;

/// Cycles to let the controller loop the frame back before the flag poll.
const LOOPBACK_SETTLE_CYCLES: u32 = 0xff;

/// 1 + 13 + 6 time quanta at the 10 MHz prescaled kernel clock -> 500 kbit/s.
const NOMINAL_BIT_TIMING: NominalBitTiming = NominalBitTiming {
    prescaler: unsafe { NonZeroU16::new_unchecked(2) },
    seg1: unsafe { NonZeroU8::new_unchecked(13) },
    seg2: unsafe { NonZeroU8::new_unchecked(6) },
    sync_jump_width: unsafe { NonZeroU8::new_unchecked(1) },
};

/// Loopback self-test against one FDCAN controller.
///
/// The controller stays in internal loopback for the lifetime of the probe,
/// so every transmitted frame is expected back on RX FIFO 0. Each call is a
/// fresh attempt: an echo that has not arrived by the time the flag is
/// polled counts as an error for that cycle and nothing is carried over.
pub struct CanProbe<I: Instance> {
    can: FdCan<I, InternalLoopbackMode>,
    register_block: RegisterBlockSendWrapper,
    rx_buf: [u8; 64],
}

struct RegisterBlockSendWrapper(*const fdcan::RegisterBlock);
unsafe impl Send for RegisterBlockSendWrapper {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive, defmt::Format)]
#[repr(u8)]
enum LastErrorCode {
    NoError = 0,
    StuffError = 1,
    FormError = 2,
    AckError = 3,
    Bit1Error = 4,
    Bit2Error = 5,
    CrcError = 6,
    NoChange = 7,
}

impl LastErrorCode {
    fn is_benign(self) -> bool {
        matches!(self, LastErrorCode::NoError | LastErrorCode::NoChange)
    }
}

/// An echoed test frame carries exactly the 0..=7 byte ramp.
pub(crate) fn is_test_payload(len: u8, data: &[u8]) -> bool {
    len as usize == TEST_PAYLOAD_LEN
        && data.len() >= TEST_PAYLOAD_LEN
        && data[..TEST_PAYLOAD_LEN]
            .iter()
            .enumerate()
            .all(|(i, byte)| *byte == i as u8)
}

impl<I: Instance> CanProbe<I> {
    pub fn new(mut can: FdCan<I, ConfigMode>, register_block: *const fdcan::RegisterBlock) -> Self {
        can.set_standard_filter(
            StandardFilterSlot::_0,
            StandardFilter::accept_all_into_fifo0(),
        );
        can.set_extended_filter(
            ExtendedFilterSlot::_0,
            ExtendedFilter::accept_all_into_fifo0(),
        );
        can.set_nominal_bit_timing(NOMINAL_BIT_TIMING);
        can.set_automatic_retransmit(false);
        can.set_frame_transmit(FrameTransmissionConfig::ClassicCanOnly);

        Self {
            can: can.into_internal_loopback(),
            register_block: RegisterBlockSendWrapper(register_block),
            rx_buf: [0; 64],
        }
    }

    pub fn probe(&mut self) -> Outcome {
        let mut payload = [0; TEST_PAYLOAD_LEN];
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let header = TxFrameHeader {
            len: TEST_PAYLOAD_LEN as u8,
            frame_format: FrameFormat::Standard,
            id: Id::Standard(unsafe { StandardId::new_unchecked(TEST_FRAME_ID) }),
            bit_rate_switching: false,
            marker: None,
        };
        if self.can.transmit(header, &payload).is_err() {
            defmt::debug!("can probe: tx fifo rejected the test frame");
            return Outcome::Error;
        }

        cortex_m::asm::delay(LOOPBACK_SETTLE_CYCLES);

        if !self.can.has_interrupt(Interrupt::RxFifo0NewMsg) {
            defmt::debug!("can probe: no echo this cycle");
            return Outcome::Error;
        }
        self.can.clear_interrupt(Interrupt::RxFifo0NewMsg);

        let lec = self.last_error_code();
        if !lec.is_benign() {
            defmt::debug!("can probe: controller logged {:?}", lec);
            return Outcome::Error;
        }

        // Judge the first frame out of the FIFO; whatever queued up behind
        // it is drained so the next cycle starts empty.
        let mut outcome = Outcome::Error;
        let mut first = true;
        while let Ok(overrun) = self.can.receive0(&mut self.rx_buf) {
            let info = overrun.unwrap();
            if first {
                first = false;
                if is_test_payload(info.len, &self.rx_buf) {
                    outcome = Outcome::Normal;
                } else {
                    defmt::debug!("can probe: echo payload mismatch");
                }
            }
        }
        outcome
    }

    fn last_error_code(&self) -> LastErrorCode {
        let bits = unsafe { &*self.register_block.0 }.psr.read().lec().bits();
        LastErrorCode::try_from_primitive(bits).expect("Bit pattern should always be valid")
    }
}
