//! Demo sequence
//!
//! Brings up the cellular data connection, resolves the two servers and then
//! alternates a UDP NTP query and a TCP HTTP GET until the user button is
//! pressed. Every completed step is acknowledged with a blue LED pulse;
//! failures light the red LED and the loop carries on.
//!
//! The sequence is written against the `hal-abstractions` traits only, so it
//! runs unchanged on the board and against mocks on the host.

use core::fmt::Write as _;
use core::net::{IpAddr, SocketAddr};

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{CellularInterface, Credentials, Socket, SocketStack, TcpStack, UdpStack};
use heapless::String;

use crate::button::StopSignal;
use crate::config::DemoConfig;
use crate::error::{DemoError, SessionError};
use crate::fmt::{Dbg, Disp};
use crate::ntp::{self, NTP_PACKET_LEN};
use crate::status::StatusLeds;

/// Size of the buffer shared by the UDP and TCP exchanges
pub const BUFFER_LEN: usize = 1024;

/// Upper bound on the HTTP request line
const HTTP_REQUEST_CAPACITY: usize = 256;

/// Build the HTTP/1.0 GET request for `path`
pub fn http_request(path: &str) -> Result<String<HTTP_REQUEST_CAPACITY>, core::fmt::Error> {
    let mut request = String::new();
    write!(request, "GET {} HTTP/1.0\r\n\r\n", path)?;
    Ok(request)
}

/// Outcome counters for the socket loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopStats {
    /// Completed loop iterations
    pub iterations: u32,
    /// Iterations whose UDP exchange received a reply
    pub udp_ok: u32,
    /// Iterations whose TCP exchange received a reply
    pub tcp_ok: u32,
}

/// The demo program
pub struct Demo<'a, M, D, P> {
    modem: M,
    delay: D,
    leds: &'a StatusLeds<P>,
    stop: &'a StopSignal,
    config: DemoConfig,
    stats: LoopStats,
    buf: [u8; BUFFER_LEN],
}

impl<'a, M, D, P> Demo<'a, M, D, P>
where
    M: CellularInterface + UdpStack + TcpStack,
    D: DelayNs,
    P: OutputPin,
{
    pub fn new(
        modem: M,
        delay: D,
        leds: &'a StatusLeds<P>,
        stop: &'a StopSignal,
        config: DemoConfig,
    ) -> Self {
        Self {
            modem,
            delay,
            leds,
            stop,
            config,
            stats: LoopStats::default(),
            buf: [0; BUFFER_LEN],
        }
    }

    /// Counters for the socket loop so far
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Give the modem back, e.g. to inspect it after `run`
    pub fn into_modem(self) -> M {
        self.modem
    }

    /// Run the whole sequence until the stop signal is raised
    ///
    /// Returns an error only for failures that prevent the socket loop from
    /// starting; the modem is left as it was at the point of failure.
    pub async fn run(&mut self) -> Result<(), DemoError> {
        self.leds.good();
        info!("Starting up, please wait up to 180 seconds for network registration to complete...");

        if let Err(e) = self.modem.init(self.config.pin).await {
            self.leds.bad();
            error!("Unable to initialise the interface: {:?}", Dbg(&e));
            return Err(DemoError::InitFailed);
        }
        self.pulse().await;

        let credentials = Credentials {
            apn: self.config.apn,
            username: self.config.username,
            password: self.config.password,
        };
        if let Err(e) = self.modem.set_credentials(credentials) {
            warn!("Credentials not accepted: {:?}", Dbg(&e));
        }
        info!("Registered, connecting to the packet network...");
        self.connect().await?;
        self.pulse().await;

        info!(
            "Getting the IP address of \"{}\" and \"{}\"...",
            self.config.http_host,
            self.config.ntp_host
        );
        let Some((ntp_server, http_server)) = self.resolve_servers().await else {
            self.leds.bad();
            error!(
                "Unable to get IP address of \"{}\" or \"{}\".",
                self.config.http_host,
                self.config.ntp_host
            );
            return Err(DemoError::DnsFailed);
        };
        self.pulse().await;
        info!(
            "\"{}\" address: {} on port {}.",
            self.config.ntp_host,
            Disp(&ntp_server.ip()),
            ntp_server.port()
        );
        info!(
            "\"{}\" address: {} on port {}.",
            self.config.http_host,
            Disp(&http_server.ip()),
            http_server.port()
        );

        info!("Performing socket operations in a loop (until the user button is pressed)...");
        while !self.stop.is_triggered() {
            let udp = self.udp_session(ntp_server).await;
            let tcp = self.tcp_session(http_server).await;
            self.record(udp.is_ok(), tcp.is_ok());

            self.delay.delay_ms(self.config.loop_interval_ms).await;
            if self.config.has_user_button {
                info!("[Checking if user button has been pressed]");
            }
        }

        self.pulse().await;
        info!("User button was pressed, stopping...");
        if let Err(e) = self.modem.disconnect().await {
            warn!("Disconnect failed: {:?}", Dbg(&e));
        }
        if let Err(e) = self.modem.deinit().await {
            warn!("Deinit failed: {:?}", Dbg(&e));
        }
        self.leds.off();
        info!("Stopped.");
        debug!("{} iterations run", self.stats.iterations);
        Ok(())
    }

    async fn pulse(&mut self) {
        self.leds.pulse_event(&mut self.delay).await;
    }

    fn record(&mut self, udp_ok: bool, tcp_ok: bool) {
        self.stats.iterations = self.stats.iterations.saturating_add(1);
        if udp_ok {
            self.stats.udp_ok = self.stats.udp_ok.saturating_add(1);
        }
        if tcp_ok {
            self.stats.tcp_ok = self.stats.tcp_ok.saturating_add(1);
        }
    }

    /// Activate packet data, retrying until it works or the attempt limit hits
    async fn connect(&mut self) -> Result<(), DemoError> {
        let mut failures: u32 = 0;
        while let Err(e) = self.modem.connect().await {
            failures = failures.saturating_add(1);
            debug!("Connect attempt {} failed: {:?}", failures, Dbg(&e));

            if self
                .config
                .max_connect_attempts
                .is_some_and(|max| failures >= max)
            {
                self.leds.bad();
                error!(
                    "Unable to connect to the packet network after {} attempts.",
                    failures
                );
                return Err(DemoError::ConnectFailed);
            }
            // The first failure is often just the network settling
            if failures > 1 {
                self.leds.bad();
                warn!("Retrying (have you checked that an antenna is plugged in and your APN is correct?)...");
            }
        }
        Ok(())
    }

    async fn resolve_servers(&mut self) -> Option<(SocketAddr, SocketAddr)> {
        let ntp_ip = self.resolve(self.config.ntp_host).await?;
        let http_ip = self.resolve(self.config.http_host).await?;
        Some((
            SocketAddr::new(ntp_ip, self.config.ntp_port),
            SocketAddr::new(http_ip, self.config.http_port),
        ))
    }

    async fn resolve(&mut self, host: &'static str) -> Option<IpAddr> {
        self.modem
            .gethostbyname(host)
            .await
            .map_err(|e| warn!("DNS lookup of \"{}\" failed: {:?}", host, Dbg(&e)))
            .ok()
    }

    async fn udp_session(&mut self, server: SocketAddr) -> Result<(), SessionError> {
        info!("=== UDP ===");
        info!("Opening a UDP socket...");
        let mut socket = match self.modem.open_udp().await {
            Ok(socket) => socket,
            Err(e) => {
                self.leds.bad();
                warn!("Unable to open UDP socket: {:?}", Dbg(&e));
                return Err(SessionError::Open);
            }
        };
        self.pulse().await;
        info!("UDP socket open.");
        socket.set_timeout(Some(self.config.socket_timeout_ms));

        let result = self.ntp_exchange(&socket, server).await;
        if let Err(e) = result {
            self.leds.bad();
            warn!("UDP exchange failed: {}", e);
        }

        self.close(socket).await;
        result
    }

    async fn ntp_exchange(&mut self, socket: &Socket, server: SocketAddr) -> Result<(), SessionError> {
        info!(
            "Sending time request to \"{}\" over UDP socket...",
            self.config.ntp_host
        );
        self.buf.fill(0);
        let request = ntp::request();
        self.buf[..request.len()].copy_from_slice(&request);

        let sent = self
            .modem
            .send_to(socket, server, &self.buf[..NTP_PACKET_LEN])
            .await
            .map_err(|e| {
                warn!("UDP send failed: {:?}", Dbg(&e));
                SessionError::Send
            })?;
        if sent != NTP_PACKET_LEN {
            warn!("UDP send accepted {} of {} bytes", sent, NTP_PACKET_LEN);
            return Err(SessionError::Send);
        }
        self.pulse().await;
        info!("Socket send completed, waiting for UDP response...");

        let (len, sender) = self
            .modem
            .recv_from(socket, &mut self.buf)
            .await
            .map_err(|e| {
                warn!("UDP receive failed: {:?}", Dbg(&e));
                SessionError::Receive
            })?;
        let len = len.min(BUFFER_LEN);
        if len == 0 {
            return Err(SessionError::Receive);
        }
        self.pulse().await;

        info!(
            "Received {} byte response from server {} on UDP socket:",
            len,
            Disp(&sender.ip())
        );
        info!("-------------------------------------------------------");
        match ntp::decode_transmit_time(&self.buf[..len]) {
            Some(timestamp) => info!("NTP timestamp is {}.", timestamp.datetime()),
            None => debug!("Response too short to carry a transmit timestamp"),
        }
        info!("-------------------------------------------------------");
        Ok(())
    }

    async fn tcp_session(&mut self, server: SocketAddr) -> Result<(), SessionError> {
        info!("=== TCP ===");
        info!("Opening a TCP socket...");
        let mut socket = match self.modem.open_tcp().await {
            Ok(socket) => socket,
            Err(e) => {
                self.leds.bad();
                warn!("Unable to open TCP socket: {:?}", Dbg(&e));
                return Err(SessionError::Open);
            }
        };
        self.pulse().await;
        info!("TCP socket open.");
        socket.set_timeout(Some(self.config.socket_timeout_ms));

        let result = self.http_exchange(&socket, server).await;
        if let Err(e) = result {
            self.leds.bad();
            warn!("TCP exchange failed: {}", e);
        }

        self.close(socket).await;
        result
    }

    async fn http_exchange(&mut self, socket: &Socket, server: SocketAddr) -> Result<(), SessionError> {
        info!(
            "Connecting socket to {} on port {}...",
            Disp(&server.ip()),
            server.port()
        );
        self.modem
            .connect_socket(socket, server)
            .await
            .map_err(|e| {
                warn!("TCP connect failed: {:?}", Dbg(&e));
                SessionError::Connect
            })?;
        self.pulse().await;
        info!(
            "Connected, sending HTTP GET request to \"{}\" over socket...",
            self.config.http_host
        );

        let request = http_request(self.config.http_path).map_err(|_| {
            warn!("HTTP path too long");
            SessionError::Send
        })?;
        let request_len = request.len();
        self.buf[..request_len].copy_from_slice(request.as_bytes());

        // Short request: fits in one send
        let sent = self
            .modem
            .send(socket, &self.buf[..request_len])
            .await
            .map_err(|e| {
                warn!("TCP send failed: {:?}", Dbg(&e));
                SessionError::Send
            })?;
        if sent != request_len {
            warn!("TCP send accepted {} of {} bytes", sent, request_len);
            return Err(SessionError::Send);
        }
        self.pulse().await;
        info!("Socket send completed, waiting for response...");

        let len = self
            .modem
            .recv(socket, &mut self.buf)
            .await
            .map_err(|e| {
                warn!("TCP receive failed: {:?}", Dbg(&e));
                SessionError::Receive
            })?
            .min(BUFFER_LEN);
        if len == 0 {
            return Err(SessionError::Receive);
        }
        self.pulse().await;

        info!("Received {} byte response from server on TCP socket:", len);
        info!("----------------------------------------------------");
        match core::str::from_utf8(&self.buf[..len]) {
            Ok(text) => info!("{}", text),
            Err(_) => info!("{}", &self.buf[..len]),
        }
        info!("----------------------------------------------------");
        Ok(())
    }

    async fn close(&mut self, socket: Socket) {
        info!("Closing socket...");
        if let Err(e) = SocketStack::close(&mut self.modem, socket).await {
            warn!("Socket close failed: {:?}", Dbg(&e));
        }
        self.pulse().await;
        info!("Socket closed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::testing::MockPin;
    use crate::status::Status;
    use core::cell::Cell;
    use core::net::Ipv4Addr;
    use embassy_futures::block_on;
    use std::string::{String as StdString, ToString};
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MockError;

    impl core::fmt::Display for MockError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "mock modem failure")
        }
    }

    impl core::error::Error for MockError {}

    impl embedded_io::Error for MockError {
        fn kind(&self) -> embedded_io::ErrorKind {
            embedded_io::ErrorKind::Other
        }
    }

    /// Modem that records every call and fails where told to
    #[derive(Default)]
    struct MockModem<'a> {
        calls: Vec<StdString>,
        fail_init: bool,
        connect_failures: u32,
        /// LED state seen by each connect attempt
        leds: Option<&'a StatusLeds<MockPin>>,
        connect_status: Vec<Status>,
        unresolvable: Option<&'static str>,
        fail_udp_open: bool,
        fail_tcp_connect: bool,
        fail_tcp_recv: bool,
        udp_sent: Vec<(SocketAddr, Vec<u8>)>,
        tcp_remote: Option<SocketAddr>,
        tcp_sent: Vec<u8>,
        credentials: Option<(Option<StdString>, Option<StdString>, Option<StdString>)>,
    }

    impl MockModem<'_> {
        fn log(&mut self, call: &str) {
            self.calls.push(call.to_string());
        }

        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    /// 2024-01-01 00:00:00 UTC
    fn ntp_reply() -> [u8; NTP_PACKET_LEN] {
        let mut reply = [0u8; NTP_PACKET_LEN];
        reply[0] = 0x24;
        reply[40..44].copy_from_slice(&[0xE9, 0x3C, 0x7F, 0x00]);
        reply
    }

    impl embedded_io::ErrorType for MockModem<'_> {
        type Error = MockError;
    }

    impl CellularInterface for MockModem<'_> {
        async fn init(&mut self, _pin: Option<&str>) -> Result<(), MockError> {
            self.log("init");
            if self.fail_init {
                Err(MockError)
            } else {
                Ok(())
            }
        }

        fn set_credentials(&mut self, credentials: Credentials<'_>) -> Result<(), MockError> {
            self.log("set_credentials");
            self.credentials = Some((
                credentials.apn.map(Into::into),
                credentials.username.map(Into::into),
                credentials.password.map(Into::into),
            ));
            Ok(())
        }

        async fn connect(&mut self) -> Result<(), MockError> {
            self.log("connect");
            if let Some(leds) = self.leds {
                self.connect_status.push(leds.current());
            }
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                Err(MockError)
            } else {
                Ok(())
            }
        }

        async fn gethostbyname(&mut self, host: &str) -> Result<IpAddr, MockError> {
            self.calls.push(std::format!("gethostbyname {}", host));
            if self.unresolvable == Some(host) {
                return Err(MockError);
            }
            Ok(match host {
                "2.pool.ntp.org" => IpAddr::V4(Ipv4Addr::new(162, 159, 200, 1)),
                _ => IpAddr::V4(Ipv4Addr::new(192, 0, 2, 80)),
            })
        }

        async fn disconnect(&mut self) -> Result<(), MockError> {
            self.log("disconnect");
            Ok(())
        }

        async fn deinit(&mut self) -> Result<(), MockError> {
            self.log("deinit");
            Ok(())
        }
    }

    impl SocketStack for MockModem<'_> {
        async fn close(&mut self, _socket: Socket) -> Result<(), MockError> {
            self.log("close");
            Ok(())
        }
    }

    impl UdpStack for MockModem<'_> {
        async fn open_udp(&mut self) -> Result<Socket, MockError> {
            self.log("open_udp");
            if self.fail_udp_open {
                Err(MockError)
            } else {
                Ok(Socket::new(0))
            }
        }

        async fn send_to(
            &mut self,
            socket: &Socket,
            remote: SocketAddr,
            data: &[u8],
        ) -> Result<usize, MockError> {
            self.log("send_to");
            assert_eq!(socket.timeout_ms(), Some(10_000));
            self.udp_sent.push((remote, data.to_vec()));
            Ok(data.len())
        }

        async fn recv_from(
            &mut self,
            _socket: &Socket,
            buf: &mut [u8],
        ) -> Result<(usize, SocketAddr), MockError> {
            self.log("recv_from");
            let reply = ntp_reply();
            buf[..reply.len()].copy_from_slice(&reply);
            Ok((reply.len(), "162.159.200.1:123".parse().unwrap()))
        }
    }

    impl TcpStack for MockModem<'_> {
        async fn open_tcp(&mut self) -> Result<Socket, MockError> {
            self.log("open_tcp");
            Ok(Socket::new(1))
        }

        async fn connect_socket(&mut self, _socket: &Socket, remote: SocketAddr) -> Result<(), MockError> {
            self.log("connect_socket");
            if self.fail_tcp_connect {
                return Err(MockError);
            }
            self.tcp_remote = Some(remote);
            Ok(())
        }

        async fn send(&mut self, _socket: &Socket, data: &[u8]) -> Result<usize, MockError> {
            self.log("send");
            self.tcp_sent.extend_from_slice(data);
            Ok(data.len())
        }

        async fn recv(&mut self, _socket: &Socket, buf: &mut [u8]) -> Result<usize, MockError> {
            self.log("recv");
            if self.fail_tcp_recv {
                return Err(MockError);
            }
            let body = b"HTTP/1.0 200 OK\r\n\r\nHello world!";
            buf[..body.len()].copy_from_slice(body);
            Ok(body.len())
        }
    }

    /// Delay that raises the stop signal after a number of loop pauses
    struct LoopDelay<'a> {
        stop: &'a StopSignal,
        interval_ms: u32,
        stop_after: u32,
        intervals: Cell<u32>,
        pulses: Cell<u32>,
    }

    impl<'a> LoopDelay<'a> {
        fn new(stop: &'a StopSignal, stop_after: u32) -> Self {
            Self {
                stop,
                interval_ms: DemoConfig::default().loop_interval_ms,
                stop_after,
                intervals: Cell::new(0),
                pulses: Cell::new(0),
            }
        }
    }

    impl DelayNs for LoopDelay<'_> {
        async fn delay_ns(&mut self, _ns: u32) {}

        async fn delay_ms(&mut self, ms: u32) {
            if ms == self.interval_ms {
                self.intervals.set(self.intervals.get() + 1);
                if self.intervals.get() >= self.stop_after {
                    self.stop.trigger();
                }
            } else {
                self.pulses.set(self.pulses.get() + 1);
            }
        }
    }

    struct Board {
        leds: StatusLeds<MockPin>,
        pins: [MockPin; 3],
        stop: StopSignal,
    }

    impl Board {
        fn new() -> Self {
            let pins = [MockPin::default(), MockPin::default(), MockPin::default()];
            Self {
                leds: StatusLeds::new(pins[0].clone(), pins[1].clone(), pins[2].clone()),
                pins,
                stop: StopSignal::new(),
            }
        }

        /// Lit state of (red, green, blue)
        fn lit(&self) -> (bool, bool, bool) {
            (
                !self.pins[0].is_high(),
                !self.pins[1].is_high(),
                !self.pins[2].is_high(),
            )
        }
    }

    const SETUP: [&str; 5] = [
        "init",
        "set_credentials",
        "connect",
        "gethostbyname 2.pool.ntp.org",
        "gethostbyname developer.mbed.org",
    ];

    const ITERATION: [&str; 9] = [
        "open_udp",
        "send_to",
        "recv_from",
        "close",
        "open_tcp",
        "connect_socket",
        "send",
        "recv",
        "close",
    ];

    #[test]
    fn test_default_http_request() {
        let config = DemoConfig::default();
        let request = http_request(config.http_path).unwrap();
        assert_eq!(
            request.as_str(),
            "GET /media/uploads/mbed_official/hello.txt HTTP/1.0\r\n\r\n"
        );
    }

    #[test]
    fn test_http_request_rejects_oversized_path() {
        let path = "/a".repeat(200);
        assert!(http_request(&path).is_err());
    }

    #[test]
    fn test_full_sequence_until_button_press() {
        let board = Board::new();
        let delay = LoopDelay::new(&board.stop, 2);
        let config = DemoConfig {
            apn: Some("internet"),
            ..DemoConfig::default()
        };
        let mut demo = Demo::new(MockModem::default(), delay, &board.leds, &board.stop, config);

        assert_eq!(block_on(demo.run()), Ok(()));
        assert_eq!(
            demo.stats(),
            LoopStats {
                iterations: 2,
                udp_ok: 2,
                tcp_ok: 2
            }
        );

        let modem = demo.into_modem();
        let mut expected: Vec<&str> = SETUP.to_vec();
        expected.extend(ITERATION);
        expected.extend(ITERATION);
        expected.extend(["disconnect", "deinit"]);
        assert_eq!(modem.calls, expected);

        assert_eq!(
            modem.credentials,
            Some((Some("internet".to_string()), None, None))
        );

        let ntp_server: SocketAddr = "162.159.200.1:123".parse().unwrap();
        assert_eq!(modem.udp_sent.len(), 2);
        for (remote, packet) in &modem.udp_sent {
            assert_eq!(*remote, ntp_server);
            assert_eq!(packet.as_slice(), &ntp::request()[..]);
        }

        assert_eq!(modem.tcp_remote, Some("192.0.2.80:80".parse().unwrap()));
        let request = b"GET /media/uploads/mbed_official/hello.txt HTTP/1.0\r\n\r\n";
        assert_eq!(modem.tcp_sent, [&request[..], &request[..]].concat());

        assert_eq!(board.leds.current(), Status::Off);
        assert_eq!(board.lit(), (false, false, false));
    }

    #[test]
    fn test_init_failure_stops_early() {
        let board = Board::new();
        let modem = MockModem {
            fail_init: true,
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Err(DemoError::InitFailed));
        assert_eq!(demo.into_modem().calls, ["init"]);
        assert_eq!(board.lit(), (true, false, false));
    }

    #[test]
    fn test_connect_retries_until_success() {
        let board = Board::new();
        let modem = MockModem {
            connect_failures: 3,
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Ok(()));
        let modem = demo.into_modem();
        assert_eq!(modem.count("connect"), 4);
        assert_eq!(modem.count("open_udp"), 1);
    }

    #[test]
    fn test_first_connect_failure_is_not_reported() {
        let board = Board::new();
        let modem = MockModem {
            connect_failures: 2,
            leds: Some(&board.leds),
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Ok(()));
        let modem = demo.into_modem();
        assert_eq!(modem.count("connect"), 3);
        // Red only once the second attempt has failed
        assert_eq!(modem.connect_status.len(), 3);
        assert_ne!(modem.connect_status[0], Status::Bad);
        assert_ne!(modem.connect_status[1], Status::Bad);
        assert_eq!(modem.connect_status[2], Status::Bad);
    }

    #[test]
    fn test_connect_gives_up_at_attempt_limit() {
        let board = Board::new();
        let modem = MockModem {
            connect_failures: 10,
            ..MockModem::default()
        };
        let config = DemoConfig {
            max_connect_attempts: Some(2),
            ..DemoConfig::default()
        };
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, config);

        assert_eq!(block_on(demo.run()), Err(DemoError::ConnectFailed));
        let modem = demo.into_modem();
        assert_eq!(modem.count("connect"), 2);
        assert_eq!(modem.count("open_udp"), 0);
        assert_eq!(board.lit(), (true, false, false));
    }

    #[test]
    fn test_dns_failure_stops_before_loop() {
        let board = Board::new();
        let modem = MockModem {
            unresolvable: Some("developer.mbed.org"),
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Err(DemoError::DnsFailed));
        assert_eq!(demo.into_modem().calls, SETUP);
        assert_eq!(board.lit(), (true, false, false));
    }

    #[test]
    fn test_socket_failures_do_not_stop_the_loop() {
        let board = Board::new();
        let modem = MockModem {
            fail_udp_open: true,
            fail_tcp_recv: true,
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 3);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Ok(()));
        assert_eq!(
            demo.stats(),
            LoopStats {
                iterations: 3,
                udp_ok: 0,
                tcp_ok: 0
            }
        );

        let modem = demo.into_modem();
        assert_eq!(modem.count("open_udp"), 3);
        assert_eq!(modem.count("send_to"), 0);
        // TCP socket is still closed after the failed receive
        assert_eq!(modem.count("recv"), 3);
        assert_eq!(modem.count("close"), 3);
        assert_eq!(&modem.calls[modem.calls.len() - 2..], ["disconnect", "deinit"]);
        assert_eq!(board.lit(), (false, false, false));
    }

    #[test]
    fn test_tcp_connect_failure_still_closes_socket() {
        let board = Board::new();
        let modem = MockModem {
            fail_tcp_connect: true,
            ..MockModem::default()
        };
        let delay = LoopDelay::new(&board.stop, 2);
        let mut demo = Demo::new(modem, delay, &board.leds, &board.stop, DemoConfig::default());

        assert_eq!(block_on(demo.run()), Ok(()));
        assert_eq!(
            demo.stats(),
            LoopStats {
                iterations: 2,
                udp_ok: 2,
                tcp_ok: 0
            }
        );

        let modem = demo.into_modem();
        assert_eq!(modem.count("connect_socket"), 2);
        assert_eq!(modem.count("send"), 0);
        assert_eq!(modem.count("recv"), 0);
        // One UDP and one TCP close per iteration
        assert_eq!(modem.count("close"), 4);
        let tcp_close = modem
            .calls
            .iter()
            .position(|c| c == "connect_socket")
            .map(|i| &modem.calls[i + 1]);
        assert_eq!(tcp_close.map(StdString::as_str), Some("close"));
        assert!(modem.tcp_sent.is_empty());
    }

    #[test]
    fn test_stop_before_loop_skips_sockets() {
        let board = Board::new();
        board.stop.trigger();
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(
            MockModem::default(),
            delay,
            &board.leds,
            &board.stop,
            DemoConfig::default(),
        );

        assert_eq!(block_on(demo.run()), Ok(()));
        assert_eq!(demo.stats(), LoopStats::default());

        let modem = demo.into_modem();
        let mut expected: Vec<&str> = SETUP.to_vec();
        expected.extend(["disconnect", "deinit"]);
        assert_eq!(modem.calls, expected);
    }

    #[test]
    fn test_every_completed_step_pulses_blue() {
        let board = Board::new();
        let delay = LoopDelay::new(&board.stop, 1);
        let mut demo = Demo::new(
            MockModem::default(),
            delay,
            &board.leds,
            &board.stop,
            DemoConfig::default(),
        );

        assert_eq!(block_on(demo.run()), Ok(()));
        // init, connect, DNS, 4 UDP steps, 5 TCP steps, stop
        assert_eq!(demo.delay.pulses.get(), 13);
    }
}
