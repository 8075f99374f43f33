use serde::{Deserialize, Serialize};

/// Byte-order marks recognized by the sniffer.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// How many leading bytes the statistical fallback inspects.
const SNIFF_WINDOW: usize = 8192;

/// Result of sniffing a raw byte buffer for its character encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodingResult {
    /// Detected encoding name (WHATWG label, e.g. "UTF-8")
    pub encoding: String,
    /// Confidence in the detection (0.0 to 1.0; 1.0 when a BOM is present)
    pub confidence: f64,
    /// Whether the buffer starts with a byte-order mark
    pub has_bom: bool,
    /// Which byte-order mark was found, if any
    pub bom_type: BomType,
}

/// The three standard byte-order marks, or none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BomType {
    Utf8,
    Utf16Le,
    Utf16Be,
    None,
}

impl std::fmt::Display for BomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BomType::Utf8 => "UTF-8",
            BomType::Utf16Le => "UTF-16 LE",
            BomType::Utf16Be => "UTF-16 BE",
            BomType::None => "none",
        };
        write!(f, "{}", label)
    }
}

/// Sniff the character encoding of a raw byte buffer.
///
/// BOM signatures are matched deterministically with confidence 1.0. Without
/// a BOM the guess is statistical: UTF-8 validity, then NUL-interleave (bare
/// UTF-16), then a WINDOWS-1252 degrade. Never fails; an unrecognized buffer
/// yields a low-confidence default so downstream always receives decodable
/// text.
pub fn sniff_encoding(bytes: &[u8]) -> EncodingResult {
    if bytes.starts_with(UTF8_BOM) {
        return EncodingResult {
            encoding: "UTF-8".to_string(),
            confidence: 1.0,
            has_bom: true,
            bom_type: BomType::Utf8,
        };
    }
    if bytes.starts_with(UTF16_LE_BOM) {
        return EncodingResult {
            encoding: "UTF-16LE".to_string(),
            confidence: 1.0,
            has_bom: true,
            bom_type: BomType::Utf16Le,
        };
    }
    if bytes.starts_with(UTF16_BE_BOM) {
        return EncodingResult {
            encoding: "UTF-16BE".to_string(),
            confidence: 1.0,
            has_bom: true,
            bom_type: BomType::Utf16Be,
        };
    }

    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    if window.is_empty() {
        return EncodingResult {
            encoding: "UTF-8".to_string(),
            confidence: 1.0,
            has_bom: false,
            bom_type: BomType::None,
        };
    }

    // Bare UTF-16 shows up as NULs interleaved with ASCII. Check which half
    // of the byte pairs carries the NULs to pick endianness.
    let nul_even = window.iter().step_by(2).filter(|b| **b == 0).count();
    let nul_odd = window.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    let pairs = window.len() / 2;
    if pairs > 0 {
        if nul_odd * 10 >= pairs * 3 && nul_odd > nul_even * 2 {
            return EncodingResult {
                encoding: "UTF-16LE".to_string(),
                confidence: 0.55,
                has_bom: false,
                bom_type: BomType::None,
            };
        }
        if nul_even * 10 >= pairs * 3 && nul_even > nul_odd * 2 {
            return EncodingResult {
                encoding: "UTF-16BE".to_string(),
                confidence: 0.55,
                has_bom: false,
                bom_type: BomType::None,
            };
        }
    }

    if std::str::from_utf8(window).is_ok() {
        let non_ascii = window.iter().filter(|b| **b >= 0x80).count();
        // Valid multi-byte sequences are a strong UTF-8 signal; pure ASCII is
        // compatible with UTF-8 but indistinguishable from Latin encodings.
        let confidence = if non_ascii > 0 { 0.95 } else { 0.9 };
        return EncodingResult {
            encoding: "UTF-8".to_string(),
            confidence,
            has_bom: false,
            bom_type: BomType::None,
        };
    }

    EncodingResult {
        encoding: "windows-1252".to_string(),
        confidence: 0.4,
        has_bom: false,
        bom_type: BomType::None,
    }
}

/// Decode a raw byte buffer using a previous sniff result.
///
/// Decoding is lossy on malformed sequences and strips any leading BOM, so
/// the rest of the pipeline always works on clean text.
pub fn decode_bytes(bytes: &[u8], detected: &EncodingResult) -> String {
    let encoding = encoding_rs::Encoding::for_label(detected.encoding.as_bytes())
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_utf8_bom() {
        let bytes = b"\xEF\xBB\xBFname,email\n";
        let result = sniff_encoding(bytes);
        assert_eq!(result.encoding, "UTF-8");
        assert_eq!(result.confidence, 1.0);
        assert!(result.has_bom);
        assert_eq!(result.bom_type, BomType::Utf8);
    }

    #[test]
    fn detects_utf16_le_bom() {
        let bytes = b"\xFF\xFEn\x00a\x00";
        let result = sniff_encoding(bytes);
        assert_eq!(result.bom_type, BomType::Utf16Le);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn detects_utf16_be_bom() {
        let bytes = b"\xFE\xFF\x00n\x00a";
        let result = sniff_encoding(bytes);
        assert_eq!(result.bom_type, BomType::Utf16Be);
    }

    #[test]
    fn plain_ascii_defaults_to_utf8() {
        let result = sniff_encoding(b"name,email\nalice,a@example.com\n");
        assert_eq!(result.encoding, "UTF-8");
        assert!(!result.has_bom);
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn valid_multibyte_utf8_raises_confidence() {
        let result = sniff_encoding("name\nJos\u{e9}\n".as_bytes());
        assert_eq!(result.encoding, "UTF-8");
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn bare_utf16_le_detected_by_nul_interleave() {
        let mut bytes = Vec::new();
        for b in b"name,email,dept" {
            bytes.push(*b);
            bytes.push(0);
        }
        let result = sniff_encoding(&bytes);
        assert_eq!(result.encoding, "UTF-16LE");
        assert!(!result.has_bom);
    }

    #[test]
    fn invalid_utf8_degrades_to_windows_1252() {
        // 0xE9 alone is not valid UTF-8 but is e-acute in windows-1252
        let result = sniff_encoding(b"Jos\xE9,75000\n");
        assert_eq!(result.encoding, "windows-1252");
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBFname";
        let detected = sniff_encoding(bytes);
        assert_eq!(decode_bytes(bytes, &detected), "name");
    }

    #[test]
    fn decode_never_fails() {
        let bytes = b"Jos\xE9";
        let detected = sniff_encoding(bytes);
        let text = decode_bytes(bytes, &detected);
        assert_eq!(text, "Jos\u{e9}");
    }
}
