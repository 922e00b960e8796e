use open_bist_common::report::Outcome;
use stm32h7xx_hal::hal_02::blocking::spi::Transfer;

/// Fixed full-duplex test pattern, clocked out and expected straight back.
pub(crate) const TEST_PATTERN: [u8; 3] = *b"SPI";

/// Loopback self-test over a bus with MOSI wired back to MISO.
///
/// One blocking transfer per call; the read-back buffer has to match the
/// pattern byte for byte.
pub struct SpiProbe<S> {
    spi: S,
}

impl<S: Transfer<u8>> SpiProbe<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    pub fn probe(&mut self) -> Outcome {
        let mut buf = TEST_PATTERN;
        match self.spi.transfer(&mut buf) {
            Ok(read) if read == TEST_PATTERN => Outcome::Normal,
            Ok(_) => {
                defmt::debug!("spi probe: read-back mismatch");
                Outcome::Error
            }
            Err(_) => {
                defmt::debug!("spi probe: transfer failed");
                Outcome::Error
            }
        }
    }
}
