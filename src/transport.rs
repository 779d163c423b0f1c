//! # Transport Adapter
//!
//! Connectionless datagram transport the transmit job drives: open a
//! handle to the fixed destination, optionally hint that the next send is
//! the last packet of a sequence (so a radio can shorten its receive
//! window), send one payload, close. [`UdpTransport`] is the production
//! implementation over `std::net::UdpSocket`; tests substitute mocks
//! through the [`Transport`] trait.

use std::net::{SocketAddr, UdpSocket};

use anyhow::Result;

/// An open datagram flow to one destination.
pub trait TransportHandle: Send {
    /// Send one payload. Returns the number of bytes written.
    fn send(&mut self, payload: &[u8]) -> Result<usize>;

    /// Mark the next send as the last packet of a sequence.
    fn set_last_packet_hint(&mut self) -> Result<()>;

    /// Release the underlying socket.
    fn close(self: Box<Self>);
}

/// Factory for [`TransportHandle`]s.
pub trait Transport: Send + Sync {
    fn open(&self, dest: SocketAddr) -> Result<Box<dyn TransportHandle>>;
}

/// UDP transport bound to an ephemeral local port per open.
pub struct UdpTransport;

impl Transport for UdpTransport {
    fn open(&self, dest: SocketAddr) -> Result<Box<dyn TransportHandle>> {
        let bind_addr: SocketAddr = if dest.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(dest)?;
        Ok(Box::new(UdpHandle {
            socket,
            last_packet: false,
        }))
    }
}

struct UdpHandle {
    socket: UdpSocket,
    last_packet: bool,
}

impl TransportHandle for UdpHandle {
    fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let n = self.socket.send(payload)?;
        if self.last_packet {
            tracing::debug!(bytes = n, "sent with last-packet hint");
        }
        Ok(n)
    }

    fn set_last_packet_hint(&mut self) -> Result<()> {
        // Host OS sockets have no release-assist option; the hint is
        // recorded and surfaced in logs. Modem-backed transports map this
        // to their radio's last-packet socket option.
        self.last_packet = true;
        tracing::debug!("last-packet hint recorded (no OS-level socket option)");
        Ok(())
    }

    fn close(self: Box<Self>) {}
}
