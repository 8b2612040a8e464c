//! Serial channel to the sensor

use crate::bridge::SerialLink;
use crate::error::Result;
use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits, TTYPort};
use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::thread;
use std::time::Duration;

/// How long the transmit line is held in the break state, matching the
/// platform-default duration of `tcsendbreak`
const BREAK_HOLD: Duration = Duration::from_millis(250);

/// Serial port wrapper for the sensor's UART link
///
/// Opens a native port so the raw descriptor is available to the bridge
/// loop's readiness wait. The port is closed when the channel drops.
pub struct SerialChannel {
    port: TTYPort,
}

impl SerialChannel {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (the SDS011 talks 9600)
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open_native()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(SerialChannel { port })
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl SerialLink for SerialChannel {
    fn raw_fd(&self) -> RawFd {
        self.port.as_raw_fd()
    }

    /// Assert the break condition, hold it, release it
    fn send_break(&mut self) -> Result<()> {
        debug!("Sending line break");
        self.port.set_break()?;
        thread::sleep(BREAK_HOLD);
        self.port.clear_break()?;
        Ok(())
    }
}
