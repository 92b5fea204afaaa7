//! Print job records supplied by callers.

use serde::{Deserialize, Serialize};

/// One label job. Constructed by the caller with already-validated data and
/// consumed entirely within a single print call; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub factory: String,
    pub style: String,
    pub buyer: String,
    pub line: String,
    pub color: String,
    pub size: String,
    /// Piece count carried on the label. Zero renders normally.
    pub count: u32,
    /// Caller-maintained per-session sequence number.
    pub sequence: u32,
    /// Unique payload for the label's QR code.
    pub content_id: String,
    /// Defect entries, used only by the defect label layout.
    #[serde(default)]
    pub defects: Vec<DefectEntry>,
}

/// One defect line on a defect-tracking label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectEntry {
    pub name: String,
    pub quantity: u32,
}
