use open_bist_common::report::Outcome;
use stm32h7xx_hal::hal_02::watchdog::Watchdog;
use stm32h7xx_hal::watchdog::SystemWindowWatchdog;

/// Services the window watchdog once per supervisory cycle.
///
/// The feed itself is the test: if the loop stops calling this, the
/// watchdog times out and resets the whole system, which is the only
/// recovery mechanism there is. Nothing weaker is reported.
pub struct WatchdogProbe {
    watchdog: SystemWindowWatchdog,
}

impl WatchdogProbe {
    pub fn new(watchdog: SystemWindowWatchdog) -> Self {
        Self { watchdog }
    }

    pub fn probe(&mut self) -> Outcome {
        self.watchdog.feed();
        Outcome::Normal
    }
}
