use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on diagnostic text carried by errors and log lines.
pub const MAX_DETAIL_CHARS: usize = 500;

/// Cap on a sanitized filename stem, well under the usual 255-byte limit.
pub const MAX_FILENAME_BYTES: usize = 200;

/// Returns the first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values rather than bytes so the cut never lands
/// inside a multi-byte sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn truncate_detail(text: &str) -> String {
    truncate_chars(text, MAX_DETAIL_CHARS).to_string()
}

/// Returns the longest prefix of `text` that fits in `max_bytes` and ends on
/// a character boundary.
pub fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn path_control_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `..` first so a run like "a..b" becomes a single underscore.
    RE.get_or_init(|| Regex::new(r#"\.\.|[/\\:*?"<>|]"#).expect("static pattern compiles"))
}

/// Makes a title safe to use as a storage path segment.
///
/// Path-control sequences become `_` and the result is cut to
/// [`MAX_FILENAME_BYTES`]. A title made only of such sequences (or blank)
/// falls back to `untitled`.
pub fn sanitize_filename(title: &str) -> String {
    let trimmed = title.trim();
    let replaced = path_control_regex().replace_all(trimmed, "_");
    let capped = truncate_bytes(&replaced, MAX_FILENAME_BYTES).trim_end();
    if capped.chars().all(|c| c == '_' || c.is_whitespace()) {
        return "untitled".to_string();
    }
    capped.to_string()
}

/// Strips a leading UTF-8 byte order mark and decodes the rest, dropping
/// any invalid sequences. Valid U+FFFD characters are kept.
pub fn decode_text_lossy(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(&[0xEF_u8, 0xBB, 0xBF][..]).unwrap_or(bytes);
    body.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "第一章abc";
        assert_eq!(truncate_chars(text, 3), "第一章");
        assert_eq!(truncate_chars(text, 10), text);
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn truncate_detail_caps_at_500() {
        let long = "x".repeat(2_000);
        assert_eq!(truncate_detail(&long).chars().count(), MAX_DETAIL_CHARS);
    }

    #[test]
    fn sanitize_replaces_path_control_characters() {
        assert_eq!(sanitize_filename("My/Deck:v2"), "My_Deck_v2");
        assert_eq!(sanitize_filename(r#"a\b*c?d"e<f>g|h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_filename("../etc/passwd"), "__etc_passwd");
    }

    #[test]
    fn sanitize_falls_back_to_untitled() {
        assert_eq!(sanitize_filename("::"), "untitled");
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("   "), "untitled");
    }

    #[test]
    fn sanitize_keeps_ordinary_titles() {
        assert_eq!(sanitize_filename("Monsoon Heist"), "Monsoon Heist");
        assert_eq!(sanitize_filename("v1.2 draft"), "v1.2 draft");
    }

    #[test]
    fn truncate_bytes_backs_off_to_a_char_boundary() {
        assert_eq!(truncate_bytes("abc", 10), "abc");
        // Each character is three bytes.
        assert_eq!(truncate_bytes("नमस्ते", 4), "न");
        assert_eq!(truncate_bytes("नमस्ते", 2), "");
    }

    #[test]
    fn sanitize_caps_long_titles() {
        let title = "क".repeat(180);
        let name = sanitize_filename(&title);
        assert!(name.len() <= MAX_FILENAME_BYTES);
        assert!(title.starts_with(&name));
        assert_eq!(name.chars().count(), MAX_FILENAME_BYTES / 3);
    }

    #[test]
    fn decode_keeps_real_replacement_characters() {
        let mut bytes = "a\u{FFFD}b".as_bytes().to_vec();
        bytes.push(0xC3);
        assert_eq!(decode_text_lossy(&bytes), "a\u{FFFD}b");
    }

    #[test]
    fn decode_skips_bom_and_invalid_bytes() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("INT. OFFICE".as_bytes());
        bytes.push(0xFF);
        bytes.extend_from_slice(b" - DAY");
        assert_eq!(decode_text_lossy(&bytes), "INT. OFFICE - DAY");
    }
}
