/*!
 * Text encoding detection and safe decoding
 *
 * Detection looks at the leading bytes of a file only. Decoding then tries an
 * ordered list of candidate decoders over the whole file and keeps the first
 * one that decodes cleanly and re-encodes to exactly the original bytes.
 */

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Number of leading bytes used for detection
pub const SAMPLE_SIZE: usize = 8192;

/// Non-ASCII bytes a sample needs before a statistical guess is trusted
pub const MIN_DETECTION_EVIDENCE: usize = 16;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A decoder candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoder {
    /// Strict UTF-8
    Utf8,
    /// UTF-8 with the byte-order mark stripped
    Utf8Bom,
    /// Cyrillic 8-bit codepage
    Windows1251,
    /// ISO-8859-1, every byte maps to one code point
    Latin1,
    /// Whatever the statistical detector settled on
    Detected(&'static Encoding),
}

impl TextDecoder {
    fn from_encoding(encoding: &'static Encoding) -> Self {
        if encoding == encoding_rs::UTF_8 {
            Self::Utf8
        } else if encoding == encoding_rs::WINDOWS_1251 {
            Self::Windows1251
        } else {
            Self::Detected(encoding)
        }
    }

    /// Encoding label recorded on the scanned file
    pub fn name(&self) -> String {
        match self {
            Self::Utf8 => "utf-8".to_string(),
            Self::Utf8Bom => "utf-8-sig".to_string(),
            Self::Windows1251 => "windows-1251".to_string(),
            Self::Latin1 => "iso-8859-1".to_string(),
            Self::Detected(encoding) => encoding.name().to_lowercase(),
        }
    }

    /// Decode `bytes`, returning `None` unless the text round-trips losslessly
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Self::Utf8Bom => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(Cow::Borrowed)
            }
            Self::Windows1251 => decode_round_trip(encoding_rs::WINDOWS_1251, bytes),
            Self::Detected(encoding) => decode_round_trip(*encoding, bytes),
            Self::Latin1 => {
                let text = encoding_rs::mem::decode_latin1(bytes);
                if encoding_rs::mem::encode_latin1_lossy(&text).as_ref() == bytes {
                    Some(text)
                } else {
                    None
                }
            }
        }
    }
}

fn decode_round_trip<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    let (encoded, _, unmappable) = encoding.encode(&text);
    if unmappable || encoded.as_ref() != bytes {
        return None;
    }
    Some(text)
}

/// Decoded file content together with the encoding that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Encoding label
    pub encoding: String,
    /// Decoded content
    pub content: String,
}

/// Pick an encoding from a leading sample of a file
///
/// Valid UTF-8 wins outright. Otherwise the statistical guess is used only
/// when the sample carries at least [`MIN_DETECTION_EVIDENCE`] non-ASCII
/// bytes; thinner evidence falls back to UTF-8 and leaves the choice to
/// the decoding chain.
pub fn detect_encoding(sample: &[u8]) -> TextDecoder {
    let valid_utf8 = match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte sequence cut off by the end of the sample
        Err(e) => e.error_len().is_none(),
    };

    if valid_utf8 {
        return if sample.starts_with(UTF8_BOM) {
            TextDecoder::Utf8Bom
        } else {
            TextDecoder::Utf8
        };
    }

    let evidence = sample.iter().filter(|b| !b.is_ascii()).count();
    if evidence < MIN_DETECTION_EVIDENCE {
        tracing::trace!("{} non-ASCII bytes, not enough to guess", evidence);
        return TextDecoder::Utf8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let (encoding, plausible) = detector.guess_assess(None, true);
    if plausible {
        TextDecoder::from_encoding(encoding)
    } else {
        TextDecoder::Utf8
    }
}

/// Decode `bytes` trying `detected` first, then the fixed fallback chain.
/// Never fails: the last resort is lossy UTF-8.
pub fn decode_with_fallback(bytes: &[u8], detected: TextDecoder) -> DecodedText {
    decode_first(
        bytes,
        &[
            detected,
            TextDecoder::Utf8,
            TextDecoder::Utf8Bom,
            TextDecoder::Windows1251,
            TextDecoder::Latin1,
        ],
    )
}

fn decode_first(bytes: &[u8], candidates: &[TextDecoder]) -> DecodedText {
    let mut tried: Vec<TextDecoder> = Vec::with_capacity(candidates.len());
    for &candidate in candidates {
        if tried.contains(&candidate) {
            continue;
        }
        tried.push(candidate);

        if let Some(text) = candidate.decode(bytes) {
            return DecodedText {
                encoding: candidate.name(),
                content: text.into_owned(),
            };
        }
    }

    tracing::debug!("No candidate decoded cleanly, replacing invalid UTF-8");
    DecodedText {
        encoding: TextDecoder::Utf8.name(),
        content: String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Read a file and decode it. Errors only when the file cannot be read.
pub fn read_text_file(path: &Path) -> io::Result<DecodedText> {
    let bytes = fs::read(path)?;
    let sample = &bytes[..bytes.len().min(SAMPLE_SIZE)];
    let detected = detect_encoding(sample);
    tracing::debug!("{}: detected {}", path.display(), detected.name());
    Ok(decode_with_fallback(&bytes, detected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_detect_plain_utf8() {
        assert_eq!(detect_encoding("hello wörld".as_bytes()), TextDecoder::Utf8);
        assert_eq!(detect_encoding(b""), TextDecoder::Utf8);
    }

    #[test]
    fn test_detect_bom() {
        assert_eq!(detect_encoding(b"\xEF\xBB\xBFhello"), TextDecoder::Utf8Bom);
    }

    #[test]
    fn test_detect_tolerates_sequence_cut_by_sample() {
        // "ж" is D0 B6; drop the continuation byte
        let sample = b"abc\xD0";
        assert_eq!(detect_encoding(sample), TextDecoder::Utf8);
    }

    fn cp1251(text: &str) -> Vec<u8> {
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1251.encode(text);
        assert!(!unmappable);
        bytes.into_owned()
    }

    #[test]
    fn test_detect_cp1251_prose() {
        let text = "Съешь же ещё этих мягких французских булок, да выпей чаю. ".repeat(4);
        assert_eq!(detect_encoding(&cp1251(&text)), TextDecoder::Windows1251);
    }

    #[test]
    fn test_thin_evidence_falls_back_to_utf8() {
        // One stray Latin-1 byte is not enough to trust a guess
        assert_eq!(detect_encoding(b"caf\xE9 au lait"), TextDecoder::Utf8);

        let short = cp1251("Привет");
        assert!(short.len() < MIN_DETECTION_EVIDENCE);
        assert_eq!(detect_encoding(&short), TextDecoder::Utf8);
    }

    #[test]
    fn test_lossy_utf8_when_no_candidate_fits() {
        let decoded = decode_first(b"ok \xFF\xFE", &[TextDecoder::Utf8, TextDecoder::Utf8Bom]);
        assert_eq!(decoded.encoding, "utf-8");
        assert_eq!(decoded.content, "ok \u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_bom_is_stripped_on_decode() {
        let decoded = decode_with_fallback(b"\xEF\xBB\xBFfn main() {}", TextDecoder::Utf8Bom);
        assert_eq!(decoded.encoding, "utf-8-sig");
        assert_eq!(decoded.content, "fn main() {}");
    }

    #[test]
    fn test_cp1251_fallback() {
        // "Привет" in windows-1251
        let bytes = [0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2];
        let decoded = decode_with_fallback(&bytes, TextDecoder::Utf8);
        assert_eq!(decoded.encoding, "windows-1251");
        assert_eq!(decoded.content, "Привет");
    }

    #[test]
    fn test_latin1_round_trips_any_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = TextDecoder::Latin1.decode(&bytes).unwrap();
        assert_eq!(text.chars().count(), 256);
    }

    #[test]
    fn test_read_text_file() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello")?;

        let decoded = read_text_file(&path)?;
        assert_eq!(decoded.encoding, "utf-8");
        assert_eq!(decoded.content, "hello");

        assert!(read_text_file(&dir.path().join("missing.txt")).is_err());

        let text = "Широкая электрификация южных губерний даст мощный толчок. ".repeat(3);
        let cyrillic = dir.path().join("ru.txt");
        fs::write(&cyrillic, cp1251(&text))?;
        let decoded = read_text_file(&cyrillic)?;
        assert_eq!(decoded.encoding, "windows-1251");
        assert_eq!(decoded.content, text);
        Ok(())
    }
}
