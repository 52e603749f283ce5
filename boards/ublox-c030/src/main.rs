#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

use cellular_core::{StatusLeds, StopSignal};
use embassy_stm32::gpio::Output;

mod modem;

stm32_tim2_monotonic!(Mono, 1_000_000);

type Leds = StatusLeds<Output<'static>>;

/// Raised by the user button, polled by the demo loop
static STOP: StopSignal = StopSignal::new();

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART3])]
mod app {
    use super::*;
    use cellular_core::modem::atat::AtatIngress;
    use cellular_core::{Demo, DemoConfig, ModemConfig, UbloxModem};
    use defmt::{error, info};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Pull, Speed};
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::time::Hertz;
    use embassy_time::Delay;
    use static_cell::StaticCell;

    use embassy_stm32::usart::BufferedUartRx;
    use modem::{ModemIngress, ModemLink, ModemPeripherals};

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        button: ExtiInput<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("u-blox cellular sockets demo starting...");

        // u-blox C030: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(2) = 168 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV2),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 168 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV4; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 84 MHz

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);

        // LEDs are active low; start with all of them off
        static LEDS: StaticCell<Leds> = StaticCell::new();
        let leds: &'static Leds = LEDS.init(StatusLeds::new(
            Output::new(p.PE3, Level::High, Speed::Low), // red
            Output::new(p.PE4, Level::High, Speed::Low), // green
            Output::new(p.PE1, Level::High, Speed::Low), // blue
        ));

        // SW0
        let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);

        let modem = ModemPeripherals {
            usart: p.USART2,
            tx: p.PD5,
            rx: p.PD6,
            pwr_on: p.PE14,
            reset: p.PB5,
        };

        demo_task::spawn(modem, leds).ok();
        button_task::spawn(leds).ok();

        (Shared {}, Local { button })
    }

    /// Runs the demo sequence once, start to finish
    #[task(priority = 1)]
    async fn demo_task(_cx: demo_task::Context, periph: ModemPeripherals, leds: &'static Leds) {
        let (link, mut control) = match modem::split(periph) {
            Ok(parts) => parts,
            Err(e) => {
                leds.bad();
                error!(
                    "Modem UART configuration rejected: {:?}",
                    defmt::Debug2Format(&e)
                );
                return;
            }
        };

        info!("Powering up the modem...");
        control.power_on().await;

        let ModemLink {
            client,
            ingress,
            rx,
        } = link;
        ingress_task::spawn(ingress, rx).ok();

        let modem = UbloxModem::new(client, Delay, ModemConfig::default());
        let mut demo = Demo::new(modem, Delay, leds, &STOP, DemoConfig::default());
        match demo.run().await {
            Ok(()) => info!("All done ({})", demo.stats()),
            Err(e) => error!("Demo ended early: {}", e),
        }
    }

    /// Feeds modem output to the AT client and routes URCs
    #[task(priority = 2)]
    async fn ingress_task(
        _cx: ingress_task::Context,
        mut ingress: ModemIngress,
        mut rx: BufferedUartRx<'static>,
    ) {
        ingress.read_from(&mut rx).await;
    }

    /// User button: request a stop and acknowledge the press
    #[task(priority = 2, local = [button])]
    async fn button_task(cx: button_task::Context, leds: &'static Leds) {
        loop {
            cx.local.button.wait_for_rising_edge().await;
            if STOP.trigger() {
                info!("User button pressed");
            }
            leds.pulse_event(&mut Mono).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
