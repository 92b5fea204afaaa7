//! BLE label printer driver for TSPL-compatible thermal printers.
//!
//! Provides connection management for a single printer over Bluetooth Low
//! Energy, TSPL label rendering for production and defect labels, legacy
//! text encoding, and chunked paced transmission.

pub mod ble;
pub mod driver;
pub mod encoding;
pub mod job;
pub mod label;
pub mod link;
pub mod profile;
pub mod tspl;

// Re-exports for convenience
pub use driver::{ConnectionState, DriverConfig, PrinterDriver};
pub use job::{DefectEntry, PrintJob};
pub use link::PrinterLink;
pub use profile::PrinterProfile;

/// Errors that can occur during printer operations.
#[derive(Debug, thiserror::Error)]
pub enum PrinterError {
    #[error("device '{0}' matches no known printer profile")]
    UnsupportedDevice(String),

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("link lost: {0}")]
    LinkLost(String),

    #[error("printer not ready: no active connection")]
    PrinterNotReady,

    #[error("print failed: {0}")]
    PrintFailed(String),
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, PrinterError>;
