//! Bridge event loop
//!
//! Single-threaded loop multiplexing the serial device and the broadcast
//! socket with a blocking `poll(2)` readiness wait, the loop's only
//! suspension point. Payload flows one way (serial to decode to aggregate
//! to broadcast); control flows the other (signal to cooperative flag to
//! loop action).
//!
//! Two flags are set from signal-delivery context and only ever read or
//! cleared here: `cancel` ends the loop at the next wake, `hangup` emits a
//! serial line break without touching aggregation state. A wait interrupted
//! by a signal is a spurious wake: flags are checked, then the wait retries.
//!
//! Recoverable conditions (malformed frames, failed broadcasts, short
//! reads) are logged and absorbed; only an error indication on a polled
//! handle or a failed wait ends the loop with an error. Both handles are
//! released on every exit path when the bridge is dropped.

use crate::aggregate::Aggregator;
use crate::error::{Error, Result};
use crate::protocol::{FrameScanner, Summary};
use log::{debug, error, info, trace, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use std::io::{Read, Write};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Serial collaborator interface consumed by the loop
pub trait SerialLink: Read + Write {
    /// File descriptor for the readiness wait
    fn raw_fd(&self) -> RawFd;

    /// Best-effort line break on the transmit line
    fn send_break(&mut self) -> Result<()>;
}

/// Datagram collaborator interface consumed by the loop
pub trait DatagramLink {
    /// File descriptor for the readiness wait
    fn raw_fd(&self) -> RawFd;

    /// Fire-and-forget send to the fixed destination
    fn send(&self, datagram: &[u8]) -> std::io::Result<usize>;

    /// Receive one inbound datagram
    fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Read buffer size for both the serial device and inbound datagrams
const READ_BUFFER_SIZE: usize = 4096;

/// The bridge loop and everything it exclusively owns
pub struct Bridge<S, D> {
    serial: S,
    net: D,
    aggregator: Aggregator,
    scanner: FrameScanner,
    cancel: Arc<AtomicBool>,
    hangup: Arc<AtomicBool>,
}

impl<S: SerialLink, D: DatagramLink> Bridge<S, D> {
    /// Assemble the bridge
    ///
    /// `cancel` and `hangup` are the cooperative flags the caller registers
    /// with its signal handlers; the loop is their only reader.
    pub fn new(
        serial: S,
        net: D,
        aggregator: Aggregator,
        cancel: Arc<AtomicBool>,
        hangup: Arc<AtomicBool>,
    ) -> Self {
        Self {
            serial,
            net,
            aggregator,
            scanner: FrameScanner::new(),
            cancel,
            hangup,
        }
    }

    /// Run until cancelled or an unrecoverable handle error
    ///
    /// Returns `Ok(())` on a cooperative shutdown; any `Err` is fatal to
    /// the process. Handles are closed on drop either way.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Bridge running, one summary per {} readings",
            self.aggregator.capacity()
        );

        loop {
            let interest = PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP;
            let mut fds = [
                PollFd::new(self.serial.raw_fd(), interest),
                PollFd::new(self.net.raw_fd(), interest),
            ];

            let interrupted = match poll(&mut fds, -1) {
                Ok(_) => false,
                // A signal landed mid-wait: treat as a spurious wake so the
                // flag checks below run, then wait again.
                Err(Errno::EINTR) | Err(Errno::EAGAIN) => true,
                Err(e) => {
                    error!("Readiness wait failed: {}", e);
                    return Err(e.into());
                }
            };

            if self.cancel.load(Ordering::Relaxed) {
                info!("Shutdown requested");
                return Ok(());
            }
            if self.hangup.swap(false, Ordering::Relaxed) {
                debug!("Hangup requested, sending line break");
                if let Err(e) = self.serial.send_break() {
                    warn!("Line break failed: {}", e);
                }
            }
            if interrupted {
                continue;
            }

            let serial_events = fds[0].revents().unwrap_or_else(PollFlags::empty);
            let net_events = fds[1].revents().unwrap_or_else(PollFlags::empty);

            self.service_serial(serial_events)?;
            self.service_net(net_events)?;
        }
    }

    /// Handle readiness on the serial device
    fn service_serial(&mut self, events: PollFlags) -> Result<()> {
        if events.contains(PollFlags::POLLERR) {
            error!("Serial device reported an error condition");
            return Err(Error::Device("serial device"));
        }
        if events.contains(PollFlags::POLLHUP) {
            info!("Hangup received on serial device");
        }
        if events.contains(PollFlags::POLLIN) {
            let mut buf = [0u8; READ_BUFFER_SIZE];
            match self.serial.read(&mut buf) {
                Ok(0) => debug!("Serial read returned no data"),
                Ok(n) => {
                    if log::log_enabled!(log::Level::Trace) {
                        trace!("Serial rx {} bytes: {}", n, hex_dump(&buf[..n]));
                    }
                    self.ingest(&buf[..n]);
                }
                Err(e) => warn!("Serial read failed: {}", e),
            }
        }
        Ok(())
    }

    /// Handle readiness on the broadcast socket
    fn service_net(&mut self, events: PollFlags) -> Result<()> {
        if events.contains(PollFlags::POLLERR) {
            error!("Broadcast socket reported an error condition");
            return Err(Error::Device("broadcast socket"));
        }
        if events.contains(PollFlags::POLLHUP) {
            info!("Hangup received on broadcast socket");
        }
        if events.contains(PollFlags::POLLIN) {
            let mut buf = [0u8; READ_BUFFER_SIZE];
            match self.net.recv(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    debug!("Relaying {} bytes from network to serial", n);
                    if let Err(e) = self.serial.write_all(&buf[..n]) {
                        warn!("Serial write failed: {}", e);
                    }
                }
                Err(e) => warn!("Datagram receive failed: {}", e),
            }
        }
        Ok(())
    }

    /// Feed raw serial bytes through the scanner into the aggregator
    fn ingest(&mut self, bytes: &[u8]) {
        self.scanner.push(bytes);
        while let Some(candidate) = self.scanner.next() {
            match candidate {
                Ok(reading) => {
                    trace!(
                        "Reading pm2.5={} pm10={} id={:02x}{:02x}",
                        reading.pm25,
                        reading.pm10,
                        reading.id[0],
                        reading.id[1]
                    );
                    if let Some(summary) = self.aggregator.intake(&reading) {
                        self.publish(&summary);
                    }
                }
                // Window state is untouched by anything the decoder rejects.
                Err(e) => debug!("Discarding frame: {}", e),
            }
        }
    }

    /// Encode and broadcast one summary, best-effort
    fn publish(&mut self, summary: &Summary) {
        info!(
            "Window complete: pm2.5 mean={} var={}, pm10 mean={} var={} over {} samples",
            summary.mean25, summary.variance25, summary.mean10, summary.variance10, summary.samples
        );
        // The window already reset; a failed send drops this summary only.
        if let Err(e) = self.net.send(&summary.encode()) {
            warn!("Broadcast failed, dropping summary: {}", e);
        }
    }
}

/// Space-separated hex rendering for trace-level byte dumps
fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
