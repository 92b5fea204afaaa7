//! Label layouts.
//!
//! Two layouts exist: the standard production label and the defect-tracking
//! label. Both open with the same structural preamble and close with a single
//! print-and-advance. Coordinates are in dots (8 dots/mm on this family).

use crate::job::PrintJob;
use crate::tspl::TsplBuilder;

const WIDTH_MM: u32 = 60;
const HEIGHT_MM: u32 = 40;
const GAP_MM: u32 = 2;
const SPEED: u8 = 3;
const DENSITY: u8 = 8;

const FONT: &str = "TSS24.BF2";
const MARGIN_X: u32 = 16;
const ROW_HEIGHT: u32 = 32;

/// Counter register holding the printer-side label counter.
const COUNTER_REGISTER: u8 = 1;

/// First defect line's vertical position on the defect layout.
pub const DEFECT_LIST_BASE_Y: u32 = 112;
/// Vertical advance per defect line; the trailing QR code sits at
/// `DEFECT_LIST_BASE_Y + defects.len() * DEFECT_LINE_HEIGHT`.
pub const DEFECT_LINE_HEIGHT: u32 = ROW_HEIGHT;

/// Structural commands shared by both layouts, in the order the firmware
/// expects them.
fn preamble(doc: &mut TsplBuilder, counter: u32) {
    doc.size_mm(WIDTH_MM, HEIGHT_MM)
        .gap_mm(GAP_MM, 0)
        .direction(1)
        .cls()
        .speed(SPEED)
        .density(DENSITY)
        .tear_on()
        .set_counter(COUNTER_REGISTER, 1)
        .counter_value(COUNTER_REGISTER, counter);
}

/// Render the standard production label.
///
/// `counter` is the driver's label counter, embedded before it is
/// incremented.
pub fn production(job: &PrintJob, counter: u32) -> String {
    let mut doc = TsplBuilder::new();
    preamble(&mut doc, counter);

    doc.text(MARGIN_X, 16, FONT, &job.factory)
        .text(MARGIN_X, 48, FONT, &format!("{}  {}", job.style, job.buyer))
        .text(MARGIN_X, 80, FONT, &format!("{}  {}", job.line, job.color))
        .text(MARGIN_X, 112, FONT, &format!("{}  PCS:{}", job.size, job.count))
        .text(MARGIN_X, 144, FONT, &format!("SEQ:{}", job.sequence))
        .text_counter(MARGIN_X, 176, FONT, COUNTER_REGISTER)
        .qrcode(336, 144, 'L', 5, &job.content_id)
        .print(1, 1);

    doc.build()
}

/// Render the defect-tracking label.
///
/// Each defect entry takes one line; the QR code's vertical position is a
/// function of how many defect lines precede it. An empty defect list is a
/// valid degenerate label, not an error.
pub fn defect(job: &PrintJob, counter: u32) -> String {
    let mut doc = TsplBuilder::new();
    preamble(&mut doc, counter);

    doc.text(MARGIN_X, 16, FONT, &format!("{}  {}", job.factory, job.line))
        .text(
            MARGIN_X,
            48,
            FONT,
            &format!("{}  {}  {}", job.style, job.color, job.size),
        )
        .text(MARGIN_X, 80, FONT, &format!("SEQ:{}", job.sequence))
        .text_counter(336, 80, FONT, COUNTER_REGISTER);

    for (i, entry) in job.defects.iter().enumerate() {
        let y = DEFECT_LIST_BASE_Y + (i as u32) * DEFECT_LINE_HEIGHT;
        doc.text(MARGIN_X, y, FONT, &format!("{} ({})", entry.name, entry.quantity));
    }

    let qr_y = DEFECT_LIST_BASE_Y + (job.defects.len() as u32) * DEFECT_LINE_HEIGHT;
    doc.qrcode(MARGIN_X, qr_y, 'L', 4, &job.content_id).print(1, 1);

    doc.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::DefectEntry;

    fn job_with_defects(k: usize) -> PrintJob {
        PrintJob {
            factory: "Plant 2".into(),
            style: "ST-0815".into(),
            buyer: "ACME".into(),
            line: "L-07".into(),
            color: "Navy".into(),
            size: "XL".into(),
            count: 24,
            sequence: 5,
            content_id: "c0ffee-42".into(),
            defects: (0..k)
                .map(|i| DefectEntry {
                    name: format!("defect-{i}"),
                    quantity: (i + 1) as u32,
                })
                .collect(),
        }
    }

    fn qrcode_y(rendered: &str) -> u32 {
        let line = rendered
            .split("\r\n")
            .find(|l| l.starts_with("QRCODE "))
            .expect("layout must contain a QRCODE directive");
        let coords = line.strip_prefix("QRCODE ").unwrap();
        coords.split(',').nth(1).unwrap().parse().unwrap()
    }

    #[test]
    fn production_layout_contains_all_fields() {
        let job = job_with_defects(0);
        let rendered = production(&job, 7);

        assert!(rendered.starts_with("SIZE 60 mm,40 mm\r\n"));
        assert!(rendered.contains("\"Plant 2\""));
        assert!(rendered.contains("ST-0815  ACME"));
        assert!(rendered.contains("L-07  Navy"));
        assert!(rendered.contains("XL  PCS:24"));
        assert!(rendered.contains("SEQ:5"));
        assert!(rendered.contains("@1 = \"7\""));
        assert!(rendered.contains("QRCODE 336,144,L,5,A,0,\"c0ffee-42\""));
        assert!(rendered.ends_with("PRINT 1,1\r\n\r\n"));
    }

    #[test]
    fn defect_qr_offset_tracks_line_count() {
        for k in [0usize, 1, 5] {
            let job = job_with_defects(k);
            let rendered = defect(&job, 1);

            let expected = DEFECT_LIST_BASE_Y + (k as u32) * DEFECT_LINE_HEIGHT;
            assert_eq!(qrcode_y(&rendered), expected, "k = {k}");

            for i in 0..k {
                assert!(
                    rendered.contains(&format!("defect-{i} ({})", i + 1)),
                    "defect line {i} missing for k = {k}"
                );
            }
            let line_count = rendered
                .split("\r\n")
                .filter(|l| l.contains("defect-"))
                .count();
            assert_eq!(line_count, k, "exactly k defect lines for k = {k}");
        }
    }

    #[test]
    fn empty_defect_list_is_a_valid_label() {
        let job = job_with_defects(0);
        let rendered = defect(&job, 1);

        assert!(rendered.contains(&format!("QRCODE {MARGIN_X},{DEFECT_LIST_BASE_Y}")));
        assert!(rendered.ends_with("PRINT 1,1\r\n\r\n"));
    }

    #[test]
    fn zero_count_renders_normally() {
        let mut job = job_with_defects(0);
        job.count = 0;
        let rendered = production(&job, 1);
        assert!(rendered.contains("PCS:0"));
    }
}
