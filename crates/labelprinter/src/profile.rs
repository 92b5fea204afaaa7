//! Printer profile registry.
//!
//! Each supported printer family is described by a static [`PrinterProfile`]
//! and selected by matching the device's advertised name against the
//! profile's prefix. New families are added here without touching the
//! transport logic.

use std::sync::LazyLock;
use std::time::Duration;

use encoding_rs::Encoding;
use uuid::Uuid;

/// BLE service UUID for GP series label printers.
const GP_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_18f0_0000_1000_8000_00805f9b34fb);

/// BLE write characteristic UUID carrying TSPL command data.
const GP_WRITE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x0000_2af1_0000_1000_8000_00805f9b34fb);

/// Static descriptor for one supported printer family.
#[derive(Debug, Clone)]
pub struct PrinterProfile {
    /// Family name used in logs and status messages.
    pub name: &'static str,
    /// Advertised-name prefix identifying this family.
    pub name_prefix: &'static str,
    /// GATT service exposing the command endpoint.
    pub service_uuid: Uuid,
    /// Writable characteristic the encoded payload is sent to.
    pub write_characteristic: Uuid,
    /// Largest write the link accepts in one chunk.
    pub max_chunk_bytes: usize,
    /// Pause between consecutive chunk writes. The printer's receive buffer
    /// cannot absorb an unthrottled burst; omitting this garbles the label
    /// without any visible error.
    pub inter_chunk_delay: Duration,
    /// Byte encoding the firmware expects for multi-byte characters.
    pub encoding: &'static Encoding,
}

static PROFILES: LazyLock<Vec<PrinterProfile>> = LazyLock::new(|| {
    vec![PrinterProfile {
        name: "GP TSPL",
        name_prefix: "GP-",
        service_uuid: GP_SERVICE_UUID,
        write_characteristic: GP_WRITE_CHARACTERISTIC,
        max_chunk_bytes: 100,
        inter_chunk_delay: Duration::from_millis(20),
        encoding: encoding_rs::GB18030,
    }]
});

/// All registered profiles.
pub fn registry() -> &'static [PrinterProfile] {
    PROFILES.as_slice()
}

/// Select the profile whose name prefix matches an advertised device name.
pub fn match_profile(advertised_name: &str) -> Option<&'static PrinterProfile> {
    PROFILES
        .iter()
        .find(|p| advertised_name.starts_with(p.name_prefix))
}

/// Name prefixes of every registered profile, for discovery filtering.
pub fn known_prefixes() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.name_prefix).collect()
}

/// Service UUIDs of every registered profile, for discovery filtering.
pub fn known_services() -> Vec<Uuid> {
    PROFILES.iter().map(|p| p.service_uuid).collect()
}
