//! Serial-to-UDP bridge for the SDS011 particulate-matter sensor
//!
//! Decodes the sensor's fixed 10-byte frame protocol, validates checksums,
//! aggregates readings over a count-based window, and broadcasts mean and
//! sample variance summaries as UDP datagrams on the local subnet.
//!
//! ## Data path
//!
//! ```text
//! serial frames -> decode + checksum -> windowed aggregation -> UDP broadcast
//! ```
//!
//! Inbound datagrams on the broadcast socket are relayed back to the serial
//! port, so sensor commands (e.g. work-mode changes) can be issued over the
//! network. The whole bridge is a single thread around one `poll(2)` wait;
//! termination signals shut it down cooperatively and SIGHUP triggers a
//! serial line break.

pub mod aggregate;
pub mod bridge;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod protocol;
pub mod serial;

// Re-export commonly used types
pub use config::BridgeConfig;
pub use error::{Error, Result};
