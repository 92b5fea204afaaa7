//! Legacy text encoding for the printer firmware.
//!
//! The firmware expects the profile's declared byte encoding (GB18030 on the
//! supported family) for multi-byte characters; sending UTF-8 produces
//! mojibake on the printed label. Chunking downstream operates on the
//! encoded byte length, which differs from the character count.

use encoding_rs::Encoding;

/// The rendered document contains characters the target encoding cannot
/// represent.
#[derive(Debug, thiserror::Error)]
#[error("payload not representable in {encoding}")]
pub struct EncodeError {
    pub encoding: &'static str,
}

/// Encode rendered command text into the profile's byte encoding.
pub fn encode(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, EncodeError> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(EncodeError {
            encoding: encoding.name(),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through_unchanged() {
        let bytes = encode("SIZE 60 mm,40 mm\r\n", encoding_rs::GB18030).unwrap();
        assert_eq!(bytes, b"SIZE 60 mm,40 mm\r\n");
    }

    #[test]
    fn multibyte_length_differs_from_char_count() {
        // Two CJK characters: two bytes each in GB18030, three each in UTF-8.
        let text = "工厂";
        let bytes = encode(text, encoding_rs::GB18030).unwrap();
        assert_eq!(text.chars().count(), 2);
        assert_eq!(bytes.len(), 4);
        assert_ne!(bytes.len(), text.len());
    }

    #[test]
    fn mixed_content_encodes() {
        let bytes = encode("TEXT 16,16,\"TSS24.BF2\",0,1,1,\"工厂 A\"", encoding_rs::GB18030).unwrap();
        assert!(bytes.starts_with(b"TEXT 16,16,"));
    }
}
