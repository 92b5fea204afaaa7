//! TSPL command text assembly.
//!
//! TSPL is a line-oriented textual protocol; the firmware parser is strict
//! about verb spelling and field order, so every command is emitted with its
//! literal documented form. A finished document is newline-joined and
//! terminated by a blank line.

/// Builds one TSPL document as an ordered sequence of command lines.
#[derive(Debug, Default)]
pub struct TsplBuilder {
    lines: Vec<String>,
}

/// The firmware has no quote escape; embedded double quotes would terminate
/// the field early.
fn sanitize(content: &str) -> String {
    content.replace('"', "'")
}

impl TsplBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, line: String) -> &mut Self {
        self.lines.push(line);
        self
    }

    /// Media size: `SIZE <w> mm,<h> mm`.
    pub fn size_mm(&mut self, width: u32, height: u32) -> &mut Self {
        self.push(format!("SIZE {width} mm,{height} mm"))
    }

    /// Label gap: `GAP <gap> mm,<offset> mm`.
    pub fn gap_mm(&mut self, gap: u32, offset: u32) -> &mut Self {
        self.push(format!("GAP {gap} mm,{offset} mm"))
    }

    /// Print orientation: `DIRECTION <dir>`.
    pub fn direction(&mut self, dir: u8) -> &mut Self {
        self.push(format!("DIRECTION {dir}"))
    }

    /// Clear the image buffer: `CLS`.
    pub fn cls(&mut self) -> &mut Self {
        self.push("CLS".to_string())
    }

    /// Print speed in inches per second: `SPEED <n>`.
    pub fn speed(&mut self, speed: u8) -> &mut Self {
        self.push(format!("SPEED {speed}"))
    }

    /// Print density 0..=15: `DENSITY <n>`.
    pub fn density(&mut self, density: u8) -> &mut Self {
        self.push(format!("DENSITY {density}"))
    }

    /// Tear-off mode: `SET TEAR ON`.
    pub fn tear_on(&mut self) -> &mut Self {
        self.push("SET TEAR ON".to_string())
    }

    /// Declare a persistent counter register and its per-print step:
    /// `SET COUNTER @<r> <step>`.
    pub fn set_counter(&mut self, register: u8, step: u32) -> &mut Self {
        self.push(format!("SET COUNTER @{register} {step}"))
    }

    /// Assign a counter register's current value: `@<r> = "<value>"`.
    pub fn counter_value(&mut self, register: u8, value: u32) -> &mut Self {
        self.push(format!("@{register} = \"{value}\""))
    }

    /// Fixed-position text field. Rotation and scale are fixed; the layouts
    /// position by coordinates only.
    pub fn text(&mut self, x: u32, y: u32, font: &str, content: &str) -> &mut Self {
        let content = sanitize(content);
        self.push(format!("TEXT {x},{y},\"{font}\",0,1,1,\"{content}\""))
    }

    /// Text field rendering a counter register instead of literal content.
    pub fn text_counter(&mut self, x: u32, y: u32, font: &str, register: u8) -> &mut Self {
        self.push(format!("TEXT {x},{y},\"{font}\",0,1,1,@{register}"))
    }

    /// QR code directive: `QRCODE <x>,<y>,<ecc>,<cell>,A,0,"<content>"`.
    pub fn qrcode(&mut self, x: u32, y: u32, ecc: char, cell: u8, content: &str) -> &mut Self {
        let content = sanitize(content);
        self.push(format!("QRCODE {x},{y},{ecc},{cell},A,0,\"{content}\""))
    }

    /// Print and advance: `PRINT <sets>,<copies>`.
    pub fn print(&mut self, sets: u32, copies: u32) -> &mut Self {
        self.push(format!("PRINT {sets},{copies}"))
    }

    /// Join the command lines, terminated by a blank line.
    pub fn build(&self) -> String {
        let mut out = self.lines.join("\r\n");
        out.push_str("\r\n\r\n");
        out
    }
}
