#![no_main]
#![no_std]

use open_bist_fw as _;

#[rtic::app(device = stm32h7xx_hal::stm32, peripherals = true)]
mod app {
    use open_bist_fw::can::CanProbe;
    use open_bist_fw::gpio::GpioProbe;
    use open_bist_fw::report::Reporter;
    use open_bist_fw::spi::SpiProbe;
    use open_bist_fw::watchdog::WatchdogProbe;
    use stm32h7xx_hal::{
        can::Can,
        gpio::{self, Speed},
        pac::{FDCAN1, SPI1, USART1},
        prelude::*,
        rcc::{PllConfigStrategy, rec::FdcanClkSel},
        serial::Tx,
        spi::{self, Enabled, Spi},
        watchdog::SystemWindowWatchdog,
    };

    use super::*;

    #[shared]
    struct SharedResources {}

    #[local]
    struct LocalResources {
        can_probe: CanProbe<Can<FDCAN1>>,
        gpio_probe: GpioProbe<
            gpio::gpiob::PB0<gpio::Output<gpio::PushPull>>,
            gpio::gpiob::PB1<gpio::Input>,
        >,
        spi_probe: SpiProbe<Spi<SPI1, Enabled>>,
        watchdog_probe: WatchdogProbe,
        reporter: Reporter<Tx<USART1>>,
        health_led: gpio::gpioc::PC3<gpio::Output<gpio::PushPull>>,
    }

    #[init]
    fn init(mut ctx: init::Context) -> (SharedResources, LocalResources) {
        // Initialise power...
        let pwr = ctx.device.PWR.constrain();
        let pwrcfg = pwr.smps().freeze();

        // Initialise clocks...
        let rcc = ctx.device.RCC.constrain();
        let ccdr = rcc
            .use_hse(25.MHz())
            .sys_ck(200.MHz())
            .hclk(200.MHz())
            .pll1_strategy(PllConfigStrategy::Iterative)
            .pll1_q_ck(20.MHz())
            .freeze(pwrcfg, &ctx.device.SYSCFG);

        // FDCAN kernel clock
        assert_eq!(ccdr.clocks.pll1_q_ck().unwrap().raw(), 20_000_000);

        // Initialise system...
        ctx.core.SCB.invalidate_icache();
        ctx.core.SCB.enable_icache();

        // Initialise IO...
        let gpioa = ctx.device.GPIOA.split(ccdr.peripheral.GPIOA);
        let gpiob = ctx.device.GPIOB.split(ccdr.peripheral.GPIOB);
        let gpioc = ctx.device.GPIOC.split(ccdr.peripheral.GPIOC);
        let gpioh = ctx.device.GPIOH.split(ccdr.peripheral.GPIOH);

        let mut health_led = gpioc.pc3.into_push_pull_output(); // USR LED1
        health_led.set_low();

        // Pin pair for the GPIO probe, wired together on the board
        let probe_out = gpiob.pb0.into_push_pull_output();
        let probe_in = gpiob.pb1.into_pull_down_input();

        // CAN, kept in controller-internal loopback by the probe
        let can_rx = gpioh.ph14.into_alternate().speed(Speed::VeryHigh);
        let can_tx = gpioh.ph13.into_alternate().speed(Speed::VeryHigh);
        let fdcan_prec = ccdr.peripheral.FDCAN.kernel_clk_mux(FdcanClkSel::Pll1Q);
        let can = ctx.device.FDCAN1.fdcan(can_tx, can_rx, fdcan_prec);
        let can_probe = CanProbe::new(can, FDCAN1::ptr() as _);

        // SPI, MOSI wired back to MISO
        let sck = gpioa.pa5.into_alternate();
        let miso = gpioa.pa6.into_alternate();
        let mosi = gpioa.pa7.into_alternate();
        let spi_bus = ctx.device.SPI1.spi(
            (sck, miso, mosi),
            spi::MODE_0,
            1.MHz(),
            ccdr.peripheral.SPI1,
            &ccdr.clocks,
        );
        let spi_probe = SpiProbe::new(spi_bus);

        // Report link
        let tx_pin = gpioa.pa9.into_alternate();
        let rx_pin = gpioa.pa10.into_alternate();
        let serial = ctx
            .device
            .USART1
            .serial(
                (tx_pin, rx_pin),
                115_200.bps(),
                ccdr.peripheral.USART1,
                &ccdr.clocks,
            )
            .unwrap();
        let (tx, _rx) = serial.split();
        let reporter = Reporter::new(tx);

        let mut watchdog = SystemWindowWatchdog::new(ctx.device.WWDG1, &ccdr);
        watchdog.start(100.millis());
        let watchdog_probe = WatchdogProbe::new(watchdog);

        defmt::info!("bring-up done, entering supervisory loop");

        (
            SharedResources {},
            LocalResources {
                can_probe,
                gpio_probe: GpioProbe::new(probe_out, probe_in),
                spi_probe,
                watchdog_probe,
                reporter,
                health_led,
            },
        )
    }

    #[idle(local = [can_probe, gpio_probe, spi_probe, watchdog_probe, reporter, health_led])]
    fn idle(ctx: idle::Context) -> ! {
        // Boot report: the watchdog flag is still at its boot sentinel
        // until the loop has serviced it once.
        ctx.local.reporter.send();

        loop {
            // Housekeeping: LED mirrors the last reported status
            match ctx.local.reporter.status().has_errors() {
                true => ctx.local.health_led.set_high(),
                _ => ctx.local.health_led.set_low(),
            }

            let can = ctx.local.can_probe.probe();
            let gpio = ctx.local.gpio_probe.probe();
            let spi = ctx.local.spi_probe.probe();
            let watchdog = ctx.local.watchdog_probe.probe();

            ctx.local.reporter.update(can, spi, gpio, watchdog);
            ctx.local.reporter.send();
        }
    }
}
