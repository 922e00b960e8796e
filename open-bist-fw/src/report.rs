use open_bist_common::report::{FrameCounter, Outcome, Report, StatusWord};
use stm32h7xx_hal::hal_02::serial::Write;
use stm32h7xx_hal::nb;

/// Owns the report link plus the status word and frame counter behind it.
///
/// `update` folds one cycle's probe outcomes into the status word, `send`
/// puts the frame on the wire and advances the counter — exactly once per
/// cycle, whatever the probes said.
pub struct Reporter<TX> {
    tx: TX,
    status: StatusWord,
    counter: FrameCounter,
}

impl<TX: Write<u8>> Reporter<TX> {
    pub fn new(tx: TX) -> Self {
        Self {
            tx,
            status: StatusWord::at_boot(),
            counter: FrameCounter::new(),
        }
    }

    pub fn status(&self) -> StatusWord {
        self.status
    }

    pub fn update(&mut self, can: Outcome, spi: Outcome, gpio: Outcome, watchdog: Outcome) {
        self.status.set_can(can);
        self.status.set_spi(spi);
        self.status.set_gpio(gpio);
        self.status.set_watchdog(watchdog);
    }

    /// Fire and forget: a wedged link starves the watchdog, and that is
    /// the recovery path.
    pub fn send(&mut self) {
        let report = Report {
            counter: self.counter.value(),
            status: self.status,
        };
        for byte in report.encode() {
            if nb::block!(self.tx.write(byte)).is_err() {
                defmt::debug!("report byte dropped");
            }
        }
        if nb::block!(self.tx.flush()).is_err() {
            defmt::debug!("report flush failed");
        }
        self.counter.advance();
    }
}
