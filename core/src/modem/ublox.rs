//! u-blox SARA modem driver
//!
//! Implements [`CellularInterface`], [`UdpStack`] and [`TcpStack`] on top
//! of an [`AtatClient`]. Socket payloads travel hex encoded
//! (`AT+UDCONF=1,1`) so binary data never collides with AT framing.
//!
//! Receives poll the pending-data count (`AT+USORF=<id>,0` /
//! `AT+USORD=<id>,0`) rather than waiting on `+UUSORF`/`+UUSORD` URCs. The
//! whole wait, AT round trips included, is bounded by the socket timeout.

use core::fmt::Write as _;
use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use atat::asynch::AtatClient;
use atat::AtatCmd;
use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_io::ErrorType;
use hal_abstractions::{CellularInterface, Credentials, Socket, SocketStack, TcpStack, UdpStack};
use heapless::String;

use super::command::{
    At, CloseSocket, ConnectSocket, CreateSocket, DisableEcho, GetEpsRegistration,
    GetGprsRegistration, GetPinStatus, GetProfileNetworkData, GetTcpPending, GetUdpPending,
    PinStatusCode, PowerOff, ReadTcp, ReadUdp, RegistrationStatus, ResolveName, SendTo,
    SetErrorReporting, SetHexMode, SetPin, SetProfileAction, SetProfileNumber,
    SetProfileString, SocketProtocol, WriteSocket, HEX_CHUNK, MAX_CHUNK,
};
use super::error::ModemError;
use super::hex;
use crate::config::ModemConfig;
use crate::fmt::{Dbg, Disp};

/// Longest APN, user name or password accepted
pub const MAX_CREDENTIAL_LEN: usize = 64;

const ACTIVATE: u8 = 3;
const DEACTIVATE: u8 = 4;

/// `<stat>` of `+CGREG` / `+CEREG`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Registration {
    NotRegistered,
    Home,
    Searching,
    Denied,
    Roaming,
    Unknown,
}

impl Registration {
    fn from_status(status: Result<RegistrationStatus, atat::Error>) -> Self {
        match status {
            Ok(status) => Self::from_stat(status.stat),
            Err(e) => {
                trace!("Registration query failed: {:?}", e);
                Self::Unknown
            }
        }
    }

    fn from_stat(stat: u8) -> Self {
        match stat {
            0 => Self::NotRegistered,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            5 => Self::Roaming,
            _ => Self::Unknown,
        }
    }

    fn is_registered(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// u-blox cellular modem using its internal IP stack
pub struct UbloxModem<C, D> {
    client: C,
    delay: D,
    config: ModemConfig,
    apn: Option<String<MAX_CREDENTIAL_LEN>>,
    username: Option<String<MAX_CREDENTIAL_LEN>>,
    password: Option<String<MAX_CREDENTIAL_LEN>>,
    local_ip: Option<Ipv4Addr>,
}

impl<C, D> UbloxModem<C, D>
where
    C: AtatClient,
    D: DelayNs + Clone,
{
    pub fn new(client: C, delay: D, config: ModemConfig) -> Self {
        Self {
            client,
            delay,
            config,
            apn: None,
            username: None,
            password: None,
            local_ip: None,
        }
    }

    /// Address assigned by the network while connected
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        self.local_ip
    }

    /// Hand back the AT client and delay
    pub fn release(self) -> (C, D) {
        (self.client, self.delay)
    }

    async fn execute<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<Cmd::Response, ModemError> {
        Ok(self.client.send(cmd).await?)
    }

    /// Send `AT` until the modem answers
    async fn wake(&mut self) -> Result<(), ModemError> {
        let attempts = self.config.power_on_attempts.max(1);
        for attempt in 1..=attempts {
            match self.client.send(&At).await {
                Ok(_) => return Ok(()),
                Err(e) => debug!("No answer to AT ({}/{}): {:?}", attempt, attempts, e),
            }
        }
        error!("Modem did not respond after {} attempts", attempts);
        Err(ModemError::Timeout)
    }

    async fn unlock_sim(&mut self, pin: Option<&str>) -> Result<(), ModemError> {
        match self.execute(&GetPinStatus).await?.code {
            PinStatusCode::Ready => return Ok(()),
            PinStatusCode::SimPin => {}
            other => {
                error!("SIM not ready: {:?}", Dbg(&other));
                return Err(ModemError::SimNotReady);
            }
        }

        let Some(pin) = pin else {
            error!("SIM is locked and no PIN is configured");
            return Err(ModemError::SimPinRequired);
        };
        check_argument(pin)?;
        info!("Unlocking SIM...");
        self.execute(&SetPin { pin }).await?;
        Ok(())
    }

    /// Poll GPRS and EPS registration until either reports home or roaming
    async fn wait_for_registration(&mut self) -> Result<(), ModemError> {
        let poll_ms = self.config.registration_poll_ms.max(1);
        let polls = (self.config.registration_timeout_ms / poll_ms).max(1);

        for _ in 0..polls {
            let packet = Registration::from_status(self.client.send(&GetGprsRegistration).await);
            if packet.is_registered() {
                info!("Registered on the packet network ({:?})", packet);
                return Ok(());
            }
            let eps = Registration::from_status(self.client.send(&GetEpsRegistration).await);
            if eps.is_registered() {
                info!("Registered on the EPS network ({:?})", eps);
                return Ok(());
            }
            if packet == Registration::Denied || eps == Registration::Denied {
                error!("Network registration denied");
                return Err(ModemError::RegistrationDenied);
            }
            trace!("Registration pending ({:?}/{:?})", packet, eps);
            self.delay.delay_ms(poll_ms).await;
        }

        error!(
            "Not registered after {} ms",
            self.config.registration_timeout_ms
        );
        Err(ModemError::NotRegistered)
    }

    fn require_connection(&self) -> Result<(), ModemError> {
        if self.local_ip.is_some() {
            Ok(())
        } else {
            Err(ModemError::NotConnected)
        }
    }

    async fn open_socket(&mut self, protocol: SocketProtocol) -> Result<Socket, ModemError> {
        self.require_connection()?;
        let created = self.execute(&CreateSocket { protocol }).await?;
        debug!("Socket {} created ({:?})", created.socket, protocol);
        Ok(Socket::new(created.socket))
    }

    async fn pending(&mut self, socket: &Socket, protocol: SocketProtocol) -> Result<usize, ModemError> {
        let id = socket.id();
        let pending = match protocol {
            SocketProtocol::Udp => self.execute(&GetUdpPending { socket: id, length: 0 }).await?,
            SocketProtocol::Tcp => self.execute(&GetTcpPending { socket: id, length: 0 }).await?,
        };
        Ok(pending.length)
    }

    async fn poll_pending(&mut self, socket: &Socket, protocol: SocketProtocol) -> Result<usize, ModemError> {
        let poll_ms = self.config.receive_poll_ms.max(1);
        loop {
            let pending = self.pending(socket, protocol).await?;
            if pending > 0 {
                return Ok(pending);
            }
            self.delay.delay_ms(poll_ms).await;
        }
    }

    /// Wait for pending data until the socket's timeout runs out
    async fn wait_for_data(&mut self, socket: &Socket, protocol: SocketProtocol) -> Result<usize, ModemError> {
        let Some(timeout_ms) = socket.timeout_ms() else {
            return self.poll_pending(socket, protocol).await;
        };

        let mut timer = self.delay.clone();
        match select(self.poll_pending(socket, protocol), timer.delay_ms(timeout_ms)).await {
            Either::First(pending) => pending,
            Either::Second(()) => {
                debug!("Socket {} receive timed out", socket.id());
                Err(ModemError::Timeout)
            }
        }
    }
}

fn check_argument(value: &str) -> Result<(), ModemError> {
    if value.bytes().any(|b| matches!(b, b'"' | b'\r' | b'\n')) {
        Err(ModemError::InvalidArgument)
    } else {
        Ok(())
    }
}

fn credential(value: Option<&str>) -> Result<Option<String<MAX_CREDENTIAL_LEN>>, ModemError> {
    value
        .map(|v| {
            check_argument(v)?;
            String::try_from(v).map_err(|_| ModemError::BufferOverflow)
        })
        .transpose()
}

/// The modem's stack is IPv4 only
fn ipv4(remote: SocketAddr) -> Result<String<15>, ModemError> {
    match remote.ip() {
        IpAddr::V4(ip) => {
            let mut text = String::new();
            write!(text, "{}", ip).map_err(|_| ModemError::BufferOverflow)?;
            Ok(text)
        }
        IpAddr::V6(_) => Err(ModemError::InvalidAddress),
    }
}

impl<C, D> ErrorType for UbloxModem<C, D> {
    type Error = ModemError;
}

impl<C, D> CellularInterface for UbloxModem<C, D>
where
    C: AtatClient,
    D: DelayNs + Clone,
{
    async fn init(&mut self, pin: Option<&str>) -> Result<(), ModemError> {
        self.wake().await?;
        self.execute(&DisableEcho).await?;
        self.execute(&SetErrorReporting { mode: 1 }).await?;
        self.unlock_sim(pin).await?;
        self.execute(&SetHexMode::enabled()).await?;
        self.wait_for_registration().await
    }

    fn set_credentials(&mut self, credentials: Credentials<'_>) -> Result<(), ModemError> {
        self.apn = credential(credentials.apn)?;
        self.username = credential(credentials.username)?;
        self.password = credential(credentials.password)?;
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), ModemError> {
        let profile = self.config.profile;

        // IPv4
        self.execute(&SetProfileNumber {
            profile,
            param: 0,
            value: 0,
        })
        .await?;
        let fields = [(1, &self.apn), (2, &self.username), (3, &self.password)];
        for (param, value) in fields {
            if let Some(value) = value {
                self.client
                    .send(&SetProfileString {
                        profile,
                        param,
                        value: value.as_str(),
                    })
                    .await?;
            }
        }

        self.execute(&SetProfileAction {
            profile,
            action: ACTIVATE,
        })
        .await?;

        let data = self.execute(&GetProfileNetworkData { profile, param: 0 }).await?;
        let ip: Ipv4Addr = data
            .value
            .as_str()
            .parse()
            .map_err(|_| ModemError::UnexpectedResponse)?;
        info!("Packet data profile {} active, IP {}", profile, Disp(&ip));
        self.local_ip = Some(ip);
        Ok(())
    }

    async fn gethostbyname(&mut self, host: &str) -> Result<IpAddr, ModemError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        check_argument(host)?;

        let resolved = self
            .execute(&ResolveName {
                resolution_type: 0,
                host,
            })
            .await
            .map_err(|e| match e {
                ModemError::Cme | ModemError::CommandFailed => ModemError::DnsFailed,
                other => other,
            })?;
        let ip: IpAddr = resolved
            .address
            .as_str()
            .parse()
            .map_err(|_| ModemError::DnsFailed)?;
        debug!("{} resolved to {}", host, Disp(&ip));
        Ok(ip)
    }

    async fn disconnect(&mut self) -> Result<(), ModemError> {
        let profile = self.config.profile;
        self.local_ip = None;
        self.execute(&SetProfileAction {
            profile,
            action: DEACTIVATE,
        })
        .await?;
        Ok(())
    }

    async fn deinit(&mut self) -> Result<(), ModemError> {
        self.local_ip = None;
        self.execute(&PowerOff).await?;
        Ok(())
    }
}

impl<C, D> SocketStack for UbloxModem<C, D>
where
    C: AtatClient,
    D: DelayNs + Clone,
{
    async fn close(&mut self, socket: Socket) -> Result<(), ModemError> {
        self.execute(&CloseSocket {
            socket: socket.id(),
        })
        .await?;
        Ok(())
    }
}

impl<C, D> UdpStack for UbloxModem<C, D>
where
    C: AtatClient,
    D: DelayNs + Clone,
{
    async fn open_udp(&mut self) -> Result<Socket, ModemError> {
        self.open_socket(SocketProtocol::Udp).await
    }

    async fn send_to(
        &mut self,
        socket: &Socket,
        remote: SocketAddr,
        data: &[u8],
    ) -> Result<usize, ModemError> {
        let ip = ipv4(remote)?;
        let mut sent = 0;
        for chunk in data.chunks(MAX_CHUNK) {
            let payload = hex::encode::<HEX_CHUNK>(chunk)?;
            let written = self
                .execute(&SendTo {
                    socket: socket.id(),
                    remote_addr: &ip,
                    remote_port: remote.port(),
                    length: chunk.len(),
                    data: &payload,
                })
                .await?;
            sent += written.length;
            if written.length < chunk.len() {
                break;
            }
        }
        Ok(sent)
    }

    async fn recv_from(
        &mut self,
        socket: &Socket,
        buf: &mut [u8],
    ) -> Result<(usize, SocketAddr), ModemError> {
        let pending = self.wait_for_data(socket, SocketProtocol::Udp).await?;
        let wanted = pending.min(buf.len()).min(MAX_CHUNK);

        let datagram = self
            .execute(&ReadUdp {
                socket: socket.id(),
                length: wanted,
            })
            .await?;
        let ip: IpAddr = datagram
            .remote_addr
            .as_str()
            .parse()
            .map_err(|_| ModemError::UnexpectedResponse)?;

        let decoded = hex::decode_into(&datagram.data, buf)?;
        if decoded != datagram.length {
            warn!("Datagram length {} but {} bytes decoded", datagram.length, decoded);
            return Err(ModemError::UnexpectedResponse);
        }
        Ok((decoded, SocketAddr::new(ip, datagram.remote_port)))
    }
}

impl<C, D> TcpStack for UbloxModem<C, D>
where
    C: AtatClient,
    D: DelayNs + Clone,
{
    async fn open_tcp(&mut self) -> Result<Socket, ModemError> {
        self.open_socket(SocketProtocol::Tcp).await
    }

    async fn connect_socket(&mut self, socket: &Socket, remote: SocketAddr) -> Result<(), ModemError> {
        let ip = ipv4(remote)?;
        debug!("Socket {} connecting to {}", socket.id(), Disp(&remote));
        self.execute(&ConnectSocket {
            socket: socket.id(),
            remote_addr: &ip,
            remote_port: remote.port(),
        })
        .await?;
        Ok(())
    }

    async fn send(&mut self, socket: &Socket, data: &[u8]) -> Result<usize, ModemError> {
        let mut sent = 0;
        for chunk in data.chunks(MAX_CHUNK) {
            let payload = hex::encode::<HEX_CHUNK>(chunk)?;
            let written = self
                .execute(&WriteSocket {
                    socket: socket.id(),
                    length: chunk.len(),
                    data: &payload,
                })
                .await?;
            sent += written.length;
            if written.length < chunk.len() {
                break;
            }
        }
        Ok(sent)
    }

    async fn recv(&mut self, socket: &Socket, buf: &mut [u8]) -> Result<usize, ModemError> {
        let pending = self.wait_for_data(socket, SocketProtocol::Tcp).await?;
        let wanted = pending.min(buf.len());

        let mut filled = 0;
        while filled < wanted {
            let read = self
                .client
                .send(&ReadTcp {
                    socket: socket.id(),
                    length: (wanted - filled).min(MAX_CHUNK),
                })
                .await?;
            if read.length == 0 {
                break;
            }
            let decoded = hex::decode_into(&read.data, &mut buf[filled..])?;
            if decoded != read.length {
                warn!("Read length {} but {} bytes decoded", read.length, decoded);
                return Err(ModemError::UnexpectedResponse);
            }
            filled += decoded;
        }
        trace!("Socket {} read {} bytes", socket.id(), filled);
        Ok(filled)
    }
}

impl<C, D> core::fmt::Debug for UbloxModem<C, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UbloxModem")
            .field("profile", &self.config.profile)
            .field("local_ip", &self.local_ip)
            .finish_non_exhaustive()
    }
}
