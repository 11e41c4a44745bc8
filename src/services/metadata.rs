//! Metadata derivation shared by every object collaborator.
//!
//! - `compute_etag` fingerprints a payload with MD5 (lowercase hex).
//! - `detect_content_type` resolves a MIME type: signature sniffing first,
//!   then the key's extension, then `application/octet-stream`.

/// Fallback MIME type when neither sniffing nor the extension table matches.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Only this many leading bytes are inspected when sniffing.
const SNIFF_LEN: usize = 512;

/// Compute the ETag of a payload: MD5 of the raw bytes as 32 lowercase hex chars.
pub fn compute_etag(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Resolve the MIME type of an object.
///
/// Order matters: a recognised signature always wins over the extension,
/// and the extension always wins over the generic default.
pub fn detect_content_type(data: &[u8], key: &str) -> String {
    sniff_content_type(data)
        .map(str::to_string)
        .or_else(|| content_type_for_extension(key))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// A leading-byte signature, plain or masked.
enum Signature {
    /// `data` starts with `bytes`.
    Prefix {
        bytes: &'static [u8],
        mime: &'static str,
    },
    /// `data & mask == pattern` over the first `pattern.len()` bytes.
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        mime: &'static str,
    },
}

impl Signature {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match self {
            Signature::Prefix { bytes, mime } => data.starts_with(bytes).then_some(*mime),
            Signature::Masked {
                mask,
                pattern,
                mime,
            } => {
                if data.len() < pattern.len() {
                    return None;
                }
                data.iter()
                    .zip(mask.iter())
                    .zip(pattern.iter())
                    .all(|((d, m), p)| d & m == *p)
                    .then_some(*mime)
            }
        }
    }
}

const fn prefix(bytes: &'static [u8], mime: &'static str) -> Signature {
    Signature::Prefix { bytes, mime }
}

const SIGNATURES: &[Signature] = &[
    prefix(b"%PDF-", "application/pdf"),
    prefix(b"%!PS-Adobe-", "application/postscript"),
    prefix(b"GIF87a", "image/gif"),
    prefix(b"GIF89a", "image/gif"),
    prefix(b"\x89PNG\r\n\x1a\n", "image/png"),
    prefix(b"\xff\xd8\xff", "image/jpeg"),
    prefix(b"BM", "image/bmp"),
    prefix(b"\x00\x00\x01\x00", "image/x-icon"),
    prefix(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Masked {
        mask: b"\xff\xff\xff\xff\x00\x00\x00\x00\xff\xff\xff\xff\xff\xff",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        mime: "image/webp",
    },
    Signature::Masked {
        mask: b"\xff\xff\xff\xff\x00\x00\x00\x00\xff\xff\xff\xff",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        mime: "audio/wave",
    },
    Signature::Masked {
        mask: b"\xff\xff\xff\xff\x00\x00\x00\x00\xff\xff\xff\xff",
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        mime: "audio/aiff",
    },
    prefix(b"ID3", "audio/mpeg"),
    prefix(b"OggS\x00", "application/ogg"),
    prefix(b"MThd\x00\x00\x00\x06", "audio/midi"),
    prefix(b"\x1a\x45\xdf\xa3", "video/webm"),
    prefix(b"wOFF", "font/woff"),
    prefix(b"wOF2", "font/woff2"),
    prefix(b"\x1f\x8b\x08", "application/gzip"),
    prefix(b"PK\x03\x04", "application/zip"),
    prefix(b"Rar!\x1a\x07\x00", "application/x-rar-compressed"),
    prefix(b"Rar!\x1a\x07\x01\x00", "application/x-rar-compressed"),
    prefix(b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    prefix(b"\x00asm", "application/wasm"),
];

/// Tags that mark a document as HTML when they open it (after whitespace).
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Inspect the leading bytes of a payload.
///
/// Returns `None` for anything that would only classify as generic text or
/// generic binary, so callers fall through to the extension table.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    let head = &data[..data.len().min(SNIFF_LEN)];

    if let Some(mime) = SIGNATURES.iter().find_map(|sig| sig.matches(head)) {
        return Some(mime);
    }
    if is_mp4(head) {
        return Some("video/mp4");
    }

    let start = head
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(head.len());
    let text = &head[start..];

    if HTML_TAGS.iter().any(|tag| html_tag_matches(text, tag)) {
        return Some("text/html; charset=utf-8");
    }
    if text.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }

    None
}

/// Case-insensitive tag prefix followed by a space or `>`.
fn html_tag_matches(text: &[u8], tag: &[u8]) -> bool {
    if text.len() < tag.len() + 1 {
        return false;
    }
    let prefix_ok = text
        .iter()
        .zip(tag.iter())
        .all(|(t, g)| t.to_ascii_uppercase() == *g);
    prefix_ok && matches!(text[tag.len()], b' ' | b'>')
}

/// An `ftyp` box that fits the sniffed prefix and lists an `mp4*` brand,
/// either as the major brand or among the compatible brands.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size || &data[4..8] != b"ftyp" {
        return false;
    }
    // offset 12 holds the minor version, not a brand
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| &data[offset..offset + 3] == b"mp4")
}

/// Guess a MIME type from the extension of `key`.
///
/// Only the last path segment counts; dotfiles such as `.json` have no
/// extension.
pub fn content_type_for_extension(key: &str) -> Option<String> {
    mime_guess::from_path(key)
        .first()
        .map(|mime| mime.to_string())
}
