//! Broadcast delivery of summary datagrams

use crate::bridge::DatagramLink;
use crate::error::Result;
use log::info;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};

/// Connectionless datagram sender aimed at a fixed destination
///
/// Bound to an ephemeral local port with `SO_BROADCAST` enabled; every
/// summary goes to the limited broadcast address on the configured port.
/// The socket also receives whatever the subnet sends back, which the
/// bridge relays to the serial side. Closed on drop.
pub struct Broadcaster {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl Broadcaster {
    /// Open a broadcast-enabled socket for the local subnet
    pub fn open(port: u16) -> Result<Self> {
        Self::open_to(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, port)))
    }

    /// Open a socket aimed at an explicit destination
    pub(crate) fn open_to(dest: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        info!("Broadcasting summaries to {}", dest);

        Ok(Broadcaster { socket, dest })
    }
}

impl DatagramLink for Broadcaster {
    fn raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    fn send(&self, datagram: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(datagram, self.dest)
    }

    fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        let (n, _source) = self.socket.recv_from(buf)?;
        Ok(n)
    }
}
