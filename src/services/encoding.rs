use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug)]
pub struct DecodedPage {
    pub text: String,
    pub encoding: &'static Encoding,
    pub had_errors: bool,
}

/// Picks the encoding of a saved page: BOM, then clean UTF-8, then `chardetng`.
pub fn detect(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    // saved pages are almost always UTF-8; skip the detector when they decode cleanly
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(Some(b"dk".as_slice()), true)
}

/// Decodes a saved page; the BOM, if any, is removed.
pub fn decode(bytes: &[u8]) -> DecodedPage {
    let encoding = detect(bytes);
    let (text, used, had_errors) = encoding.decode(bytes);

    if used != UTF_8 || had_errors {
        tracing::debug!(
            encoding = used.name(),
            confidence = confidence(text.len(), had_errors),
            had_errors,
            "decoded non-utf8 page"
        );
    }

    DecodedPage {
        text: text.into_owned(),
        encoding: used,
        had_errors,
    }
}

/// Rough trust in a detector guess, from the decoded length.
fn confidence(decoded_len: usize, had_errors: bool) -> f32 {
    if had_errors {
        return 0.35;
    }

    if decoded_len < 64 {
        0.55
    } else if decoded_len < 512 {
        0.70
    } else if decoded_len < 4096 {
        0.82
    } else {
        0.90
    }
}
