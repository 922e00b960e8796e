use open_bist_common::report::Outcome;
use stm32h7xx_hal::hal_02::digital::v2::{InputPin, OutputPin};

/// Cycles for the driven level to settle before the input pin is sampled.
const SETTLE_CYCLES: u32 = 0xff;

/// Loopback self-test over an output pin wired to an input pin.
///
/// The driven level alternates on every call whatever the outcome, so both
/// rails get exercised over time and a pin stuck at either level shows up.
pub struct GpioProbe<O, I> {
    out: O,
    input: I,
    next_level: bool,
}

impl<O: OutputPin, I: InputPin> GpioProbe<O, I> {
    pub fn new(out: O, input: I) -> Self {
        Self {
            out,
            input,
            next_level: false,
        }
    }

    pub fn probe(&mut self) -> Outcome {
        let level = self.next_level;
        self.next_level = !level;

        let driven = if level {
            self.out.set_high()
        } else {
            self.out.set_low()
        };
        if driven.is_err() {
            return Outcome::Error;
        }

        cortex_m::asm::delay(SETTLE_CYCLES);

        match self.input.is_high() {
            Ok(read) if read == level => Outcome::Normal,
            Ok(_) => {
                defmt::debug!("gpio probe: read back the wrong level");
                Outcome::Error
            }
            Err(_) => Outcome::Error,
        }
    }
}
