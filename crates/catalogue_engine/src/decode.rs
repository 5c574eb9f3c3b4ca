use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use crate::{FailureKind, FetchError};

/// Decode a listing page into UTF-8 using: BOM -> Content-Type charset -> valid UTF-8 -> chardetng.
pub fn decode_listing(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    // Directory listings are almost always plain UTF-8; skip detection when they are.
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches(&[' ', '"', '\''][..]).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<String, FetchError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors && enc == UTF_8 {
        return Err(FetchError::new(
            FailureKind::Decode,
            format!("invalid {} listing", enc.name()),
        ));
    }
    Ok(text.into_owned())
}
