use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode a URL list into UTF-8 using: BOM -> strict UTF-8 -> chardetng fallback.
pub fn decode_text(bytes: &[u8]) -> Result<DecodedText, DecodeError> {
    // 1) BOM (UTF-8, UTF-16LE/BE); the BOM itself is stripped
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    // 2) Plain UTF-8, the documented format
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(DecodedText {
            text: text.to_string(),
            encoding_label: UTF_8.name().to_string(),
        });
    }

    // 3) Legacy editors: let chardetng guess
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedText, DecodeError> {
    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::decode_text;

    #[test]
    fn utf8_bom_is_stripped() {
        let decoded = decode_text(b"\xEF\xBB\xBFhttps://a.example").unwrap();
        assert_eq!(decoded.text, "https://a.example");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn utf16le_bom_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "a\nb".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_text(&bytes).unwrap();
        assert_eq!(decoded.text, "a\nb");
        assert_eq!(decoded.encoding_label, "UTF-16LE");
    }

    #[test]
    fn plain_utf8_passes_through() {
        let decoded = decode_text("https://ejemplo.es/canción".as_bytes()).unwrap();
        assert_eq!(decoded.text, "https://ejemplo.es/canción");
    }

    #[test]
    fn latin1_bytes_fall_back_to_detection() {
        let decoded = decode_text(b"https://example.com/caf\xe9\n").unwrap();
        assert!(decoded.text.starts_with("https://example.com/caf"));
        assert!(decoded.text.ends_with('\n'));
        assert_ne!(decoded.encoding_label, "UTF-8");
    }
}
