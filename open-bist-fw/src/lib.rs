#![no_main]
#![no_std]

pub mod can;
pub mod gpio;
pub mod report;
pub mod spi;
pub mod watchdog;

use defmt_rtt as _; // global logger

use stm32h7xx_hal as _;

use panic_probe as _;

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

/// Terminates the application and makes a semihosting-capable debug tool exit
/// with status code 0.
pub fn exit() -> ! {
    semihosting::process::exit(0);
}

/// Hardfault handler.
///
/// Terminates the application and makes a semihosting-capable debug tool exit
/// with an error. This seems better than the default, which is to spin in a
/// loop.
#[cortex_m_rt::exception]
unsafe fn HardFault(_frame: &cortex_m_rt::ExceptionFrame) -> ! {
    semihosting::process::exit(1);
}

// defmt-test 0.3.0 has the limitation that this `#[tests]` attribute can only be used
// once within a crate. the module can be in any file but there can only be at most
// one `#[tests]` module in this library crate
#[cfg(test)]
#[defmt_test::tests]
mod unit_tests {
    use core::cell::Cell;
    use core::convert::Infallible;

    use defmt::{assert, assert_eq};
    use open_bist_common::report::Outcome;
    use stm32h7xx_hal::hal_02::blocking::spi::Transfer;
    use stm32h7xx_hal::hal_02::digital::v2::{InputPin, OutputPin};

    use crate::can::is_test_payload;
    use crate::gpio::GpioProbe;
    use crate::spi::SpiProbe;

    struct WireOut<'a>(&'a Cell<bool>);

    impl OutputPin for WireOut<'_> {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set(true);
            Ok(())
        }
    }

    struct WireIn<'a> {
        level: &'a Cell<bool>,
        stuck_at: Option<bool>,
    }

    impl InputPin for WireIn<'_> {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.stuck_at.unwrap_or(self.level.get()))
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    struct LoopbackSpi;

    impl Transfer<u8> for LoopbackSpi {
        type Error = Infallible;

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Infallible> {
            Ok(words)
        }
    }

    struct NoisySpi;

    impl Transfer<u8> for NoisySpi {
        type Error = Infallible;

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Infallible> {
            if let Some(last) = words.last_mut() {
                *last ^= 0x20;
            }
            Ok(words)
        }
    }

    #[test]
    fn gpio_probe_alternates_the_driven_level_on_wired_pins() {
        let level = Cell::new(true);
        let mut probe = GpioProbe::new(
            WireOut(&level),
            WireIn {
                level: &level,
                stuck_at: None,
            },
        );
        for expected in [false, true, false, true] {
            assert_eq!(probe.probe(), Outcome::Normal);
            assert_eq!(level.get(), expected);
        }
    }

    #[test]
    fn gpio_probe_keeps_toggling_against_a_stuck_input() {
        let level = Cell::new(false);
        let mut probe = GpioProbe::new(
            WireOut(&level),
            WireIn {
                level: &level,
                stuck_at: Some(true),
            },
        );
        // Driven low reads high, driven high reads high: the stuck rail is
        // caught every other call while the toggle keeps running.
        for (expected_level, expected_outcome) in [
            (false, Outcome::Error),
            (true, Outcome::Normal),
            (false, Outcome::Error),
            (true, Outcome::Normal),
        ] {
            assert_eq!(probe.probe(), expected_outcome);
            assert_eq!(level.get(), expected_level);
        }
    }

    #[test]
    fn spi_probe_passes_on_a_clean_loopback() {
        let mut probe = SpiProbe::new(LoopbackSpi);
        assert_eq!(probe.probe(), Outcome::Normal);
        assert_eq!(probe.probe(), Outcome::Normal);
    }

    #[test]
    fn spi_probe_fails_on_a_single_corrupted_byte() {
        let mut probe = SpiProbe::new(NoisySpi);
        assert_eq!(probe.probe(), Outcome::Error);
    }

    #[test]
    fn can_echo_check_requires_the_exact_ramp() {
        let ramp = [0, 1, 2, 3, 4, 5, 6, 7];
        assert!(is_test_payload(8, &ramp));

        let mut corrupted = ramp;
        corrupted[3] = 0x33;
        assert!(!is_test_payload(8, &corrupted));
        assert!(!is_test_payload(7, &ramp));
    }
}
