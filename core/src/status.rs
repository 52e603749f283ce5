//! Status LED driver
//!
//! Three active-low LEDs report the program phase: green while things are
//! fine, a short blue pulse whenever an operation completes, red on failure.
//! Both the demo task and the button task drive the LEDs, so pin access is
//! serialised with a critical section and every method takes `&self`.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

/// Default length of an event pulse
pub const DEFAULT_PULSE_MS: u32 = 500;

/// What the LEDs are currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// All LEDs off
    Off,
    /// Green: idle / operating correctly
    Good,
    /// Red: an operation failed
    Bad,
    /// Blue: an operation just completed
    Event,
}

struct Pins<P> {
    red: P,
    green: P,
    blue: P,
    status: Status,
}

impl<P: OutputPin> Pins<P> {
    fn show(&mut self, status: Status) {
        let (red, green, blue) = match status {
            Status::Off => (false, false, false),
            Status::Good => (false, true, false),
            Status::Bad => (true, false, false),
            Status::Event => (false, false, true),
        };
        // GPIO writes cannot fail on the supported boards
        set_lit(&mut self.red, red);
        set_lit(&mut self.green, green);
        set_lit(&mut self.blue, blue);
        self.status = status;
    }
}

fn set_lit<P: OutputPin>(pin: &mut P, lit: bool) {
    // Active low
    let _ = if lit { pin.set_low() } else { pin.set_high() };
}

/// Red/green/blue status LEDs
pub struct StatusLeds<P> {
    pins: Mutex<RefCell<Pins<P>>>,
    pulse_ms: u32,
}

impl<P: OutputPin> StatusLeds<P> {
    /// Take ownership of the three LED pins and switch them all off
    pub fn new(red: P, green: P, blue: P) -> Self {
        let mut pins = Pins {
            red,
            green,
            blue,
            status: Status::Off,
        };
        pins.show(Status::Off);
        Self {
            pins: Mutex::new(RefCell::new(pins)),
            pulse_ms: DEFAULT_PULSE_MS,
        }
    }

    /// Override the event pulse length
    pub fn with_pulse_ms(mut self, pulse_ms: u32) -> Self {
        self.pulse_ms = pulse_ms;
        self
    }

    /// Green on, others off
    pub fn good(&self) {
        self.show(Status::Good);
    }

    /// Red on, others off
    pub fn bad(&self) {
        self.show(Status::Bad);
    }

    /// Blue on, others off
    pub fn event(&self) {
        self.show(Status::Event);
    }

    /// Everything off
    pub fn off(&self) {
        self.show(Status::Off);
    }

    /// Flash blue for the pulse length, then return to green
    pub async fn pulse_event<D: DelayNs>(&self, delay: &mut D) {
        self.event();
        delay.delay_ms(self.pulse_ms).await;
        self.good();
    }

    /// Last state shown
    pub fn current(&self) -> Status {
        critical_section::with(|cs| self.pins.borrow_ref(cs).status)
    }

    fn show(&self, status: Status) {
        critical_section::with(|cs| self.pins.borrow_ref_mut(cs).show(status));
    }
}
