//! SARA-U201 wiring on the C030
//!
//! - USART2: TX on PD5, RX on PD6, 115200 8N1
//! - PWR_ON on PE14, pulsed low to boot the module
//! - RESET_N on PB5, held high
//!
//! The UART is split: the transmit half goes to the `atat` client the
//! driver uses, the receive half feeds the `atat` ingress.

use cellular_core::modem::atat::asynch::Client;
use cellular_core::modem::atat::{self, DefaultDigester, Ingress, ResponseSlot, UrcChannel};
use cellular_core::modem::command::{
    Urc, CLIENT_BUF_SIZE, INGRESS_BUF_SIZE, URC_CAPACITY, URC_SUBSCRIBERS,
};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::peripherals;
use embassy_stm32::usart::{self, BufferedUart, BufferedUartRx, BufferedUartTx};
use embassy_stm32::Peri;
use rtic_monotonics::stm32::prelude::*;
use static_cell::StaticCell;

use crate::Mono;

const BAUD_RATE: u32 = 115_200;

/// Must hold the longest hex-encoded socket write
const TX_BUFFER_LEN: usize = 1280;
const RX_BUFFER_LEN: usize = 2048;

embassy_stm32::bind_interrupts!(pub struct Irqs {
    USART2 => usart::BufferedInterruptHandler<peripherals::USART2>;
});

static RES_SLOT: ResponseSlot<INGRESS_BUF_SIZE> = ResponseSlot::new();
static URC_CHANNEL: UrcChannel<Urc, URC_CAPACITY, URC_SUBSCRIBERS> = UrcChannel::new();

pub type ModemClient = Client<'static, BufferedUartTx<'static>, INGRESS_BUF_SIZE>;
pub type ModemIngress =
    Ingress<'static, DefaultDigester<Urc>, Urc, INGRESS_BUF_SIZE, URC_CAPACITY, URC_SUBSCRIBERS>;

pub struct ModemPeripherals {
    pub usart: Peri<'static, peripherals::USART2>,
    pub tx: Peri<'static, peripherals::PD5>,
    pub rx: Peri<'static, peripherals::PD6>,
    pub pwr_on: Peri<'static, peripherals::PE14>,
    pub reset: Peri<'static, peripherals::PB5>,
}

/// AT link: the client for the driver, the ingress and its byte source
pub struct ModemLink {
    pub client: ModemClient,
    pub ingress: ModemIngress,
    pub rx: BufferedUartRx<'static>,
}

/// Control lines; dropping them releases the pins
pub struct ModemControl {
    pwr_on: Output<'static>,
    _reset: Output<'static>,
}

impl ModemControl {
    /// Boot the module and give it time to start its AT interface
    pub async fn power_on(&mut self) {
        self.pwr_on.set_low();
        Mono::delay(1000.millis()).await;
        self.pwr_on.set_high();
        Mono::delay(3000.millis()).await;
    }
}

/// Configure the modem UART, the AT link on top of it and the control lines
pub fn split(periph: ModemPeripherals) -> Result<(ModemLink, ModemControl), usart::ConfigError> {
    static TX_BUFFER: StaticCell<[u8; TX_BUFFER_LEN]> = StaticCell::new();
    static RX_BUFFER: StaticCell<[u8; RX_BUFFER_LEN]> = StaticCell::new();
    static INGRESS_BUF: StaticCell<[u8; INGRESS_BUF_SIZE]> = StaticCell::new();
    static CLIENT_BUF: StaticCell<[u8; CLIENT_BUF_SIZE]> = StaticCell::new();

    let mut config = usart::Config::default();
    config.baudrate = BAUD_RATE;

    let serial = BufferedUart::new(
        periph.usart,
        periph.rx,
        periph.tx,
        TX_BUFFER.init([0; TX_BUFFER_LEN]),
        RX_BUFFER.init([0; RX_BUFFER_LEN]),
        Irqs,
        config,
    )?;
    let (tx, rx) = serial.split();

    let ingress = Ingress::new(
        DefaultDigester::<Urc>::default(),
        INGRESS_BUF.init([0; INGRESS_BUF_SIZE]),
        &RES_SLOT,
        &URC_CHANNEL,
    );
    let client = Client::new(
        tx,
        &RES_SLOT,
        CLIENT_BUF.init([0; CLIENT_BUF_SIZE]),
        atat::Config::default(),
    );

    let control = ModemControl {
        pwr_on: Output::new(periph.pwr_on, Level::High, Speed::Low),
        _reset: Output::new(periph.reset, Level::High, Speed::Low),
    };
    Ok((ModemLink { client, ingress, rx }, control))
}
