use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode a response body to text.
///
/// The transport-reported encoding label is tried first. An unknown or
/// missing label falls back to statistical detection over the body bytes,
/// which itself defaults to a UTF-8-compatible encoding for empty or
/// ambiguous input. Undecodable byte sequences become U+FFFD, so this never
/// fails.
pub(crate) fn decode_body(bytes: &[u8], reported: Option<&str>) -> String {
    if let Some(label) = reported
        && let Some(encoding) = Encoding::for_label(label.trim().as_bytes())
    {
        return encoding.decode(bytes).0.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).decode(bytes).0.into_owned()
}
