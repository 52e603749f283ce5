//! Scripted AT client and virtual clock for driver tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::{poll_fn, Future};
use std::pin::pin;
use std::rc::Rc;
use std::string::{String, ToString};
use std::task::{Context, Poll, Waker};
use std::vec::Vec;

use atat::asynch::AtatClient;
use atat::AtatCmd;
use embedded_hal_async::delay::DelayNs;

/// Milliseconds of simulated time shared by every clone
///
/// A sleep finishes once the clock reaches its deadline; [`run`] moves the
/// clock to the earliest pending deadline whenever nothing else can make
/// progress, so races between timers resolve in simulated time order.
#[derive(Clone, Default)]
pub struct MockClock {
    now_ms: Rc<Cell<u64>>,
    deadlines: Rc<RefCell<Vec<u64>>>,
}

impl MockClock {
    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub async fn sleep_ms(&self, ms: u64) {
        let deadline = self.now_ms() + ms;
        poll_fn(|_| {
            if self.now_ms() >= deadline {
                Poll::Ready(())
            } else {
                self.deadlines.borrow_mut().push(deadline);
                Poll::Pending
            }
        })
        .await
    }

    fn advance(&self) -> bool {
        let next = self.deadlines.borrow_mut().drain(..).min();
        match next {
            Some(deadline) => {
                self.now_ms.set(deadline.max(self.now_ms()));
                true
            }
            None => false,
        }
    }
}

impl DelayNs for MockClock {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep_ms(u64::from(ns).div_ceil(1_000_000)).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep_ms(ms.into()).await
    }
}

/// Drive `future` to completion in simulated time
pub fn run<F: Future>(clock: &MockClock, future: F) -> F::Output {
    let mut future = pin!(future);
    let mut cx = Context::from_waker(Waker::noop());
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        assert!(clock.advance(), "future is stuck with no pending sleep");
    }
}

enum Reply {
    Response(String),
    Error(atat::Error),
}

/// `AtatClient` that checks each command line against a script
///
/// Each scripted step holds the command line as the modem would receive
/// it (without the terminator) and either the response text `atat` would
/// hand to the parser (`+USOCR: 0`, empty for a bare `OK`) or an error.
/// Every exchange takes `latency_ms` of simulated time.
pub struct ScriptedClient {
    script: VecDeque<(String, Reply)>,
    sent: Vec<String>,
    clock: MockClock,
    latency_ms: u64,
}

impl ScriptedClient {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            script: VecDeque::new(),
            sent: Vec::new(),
            clock: clock.clone(),
            latency_ms: 0,
        }
    }

    pub fn latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Answer `command` with `response` followed by `OK`
    pub fn ok(mut self, command: &str, response: &str) -> Self {
        self.script
            .push_back((command.to_string(), Reply::Response(response.to_string())));
        self
    }

    /// Answer `command` with an error
    pub fn fail(mut self, command: &str, error: atat::Error) -> Self {
        self.script.push_back((command.to_string(), Reply::Error(error)));
        self
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn finished(&self) -> bool {
        self.script.is_empty()
    }
}

impl AtatClient for ScriptedClient {
    async fn send<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<Cmd::Response, atat::Error> {
        let mut buf = std::vec![0u8; Cmd::MAX_LEN];
        let len = cmd.write(&mut buf);
        let line = std::str::from_utf8(&buf[..len])
            .unwrap()
            .trim_end()
            .to_string();

        self.clock.sleep_ms(self.latency_ms).await;

        let Some((expected, reply)) = self.script.pop_front() else {
            panic!("unscripted command {line:?}");
        };
        assert_eq!(line, expected, "unexpected command");
        self.sent.push(line);

        match reply {
            Reply::Response(response) => cmd.parse(Ok(response.as_bytes())),
            Reply::Error(e) => Err(e),
        }
    }
}
