//! Socket traits for IP stacks hosted on a modem
//!
//! Sockets are identified by a small handle; the stack that created a handle
//! owns the underlying resource until `close` consumes it.

use core::future::Future;
use core::net::SocketAddr;

use embedded_io::ErrorType;

/// Handle to a socket opened on a modem-hosted IP stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Socket {
    id: u8,
    timeout_ms: Option<u32>,
}

impl Socket {
    /// Wrap a socket id returned by the modem; receives block forever
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            timeout_ms: None,
        }
    }

    /// Socket id as assigned by the modem
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Receive timeout, `None` meaning wait forever
    pub const fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    /// Set the receive timeout in milliseconds
    pub fn set_timeout(&mut self, timeout_ms: Option<u32>) {
        self.timeout_ms = timeout_ms;
    }
}

/// Operations common to UDP and TCP sockets
pub trait SocketStack: ErrorType {
    /// Release the socket on the modem
    fn close(&mut self, socket: Socket) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Datagram sockets
pub trait UdpStack: SocketStack {
    /// Create a UDP socket
    fn open_udp(&mut self) -> impl Future<Output = Result<Socket, Self::Error>>;

    /// Send `data` to `remote`, returning the number of bytes accepted
    fn send_to(
        &mut self,
        socket: &Socket,
        remote: SocketAddr,
        data: &[u8],
    ) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Receive one datagram into `buf`, honouring the socket timeout
    fn recv_from(
        &mut self,
        socket: &Socket,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddr), Self::Error>>;
}

/// Stream sockets
pub trait TcpStack: SocketStack {
    /// Create a TCP socket
    fn open_tcp(&mut self) -> impl Future<Output = Result<Socket, Self::Error>>;

    /// Connect the socket to `remote`
    fn connect_socket(
        &mut self,
        socket: &Socket,
        remote: SocketAddr,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Send `data`, returning the number of bytes accepted
    fn send(
        &mut self,
        socket: &Socket,
        data: &[u8],
    ) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Receive available data into `buf`, honouring the socket timeout
    fn recv(
        &mut self,
        socket: &Socket,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>>;
}
