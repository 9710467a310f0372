//! Request path canonicalization
//!
//! The path the guard classifies must be the path the upstream serves. Percent-encoded
//! unreserved characters are decoded, `.`/`..` segments are resolved and empty segments
//! collapsed before classification, and only the canonical form is forwarded.

/// Why a request path was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// Broken percent-encoding
    MalformedEncoding,
    /// Encoded separators (`%2F`, `%5C`) or backslashes, which upstreams may split on
    AmbiguousSeparator,
}

/// Canonical form of a request path
///
/// # Errors
///
/// Returns an error for paths whose segment boundaries are ambiguous: malformed
/// percent-encoding, encoded slashes or backslashes.
pub fn canonicalize_path(raw: &str) -> Result<String, PathRejection> {
    if raw.contains('\\') {
        return Err(PathRejection::AmbiguousSeparator);
    }

    let decoded = decode_unreserved(raw)?;
    let trailing_slash = decoded.len() > 1 && decoded.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut canonical = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        canonical.push('/');
    }
    Ok(canonical)
}

/// Decode `%XX` escapes of unreserved characters; keep every other escape, uppercased
fn decode_unreserved(raw: &str) -> Result<String, PathRejection> {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let ch = raw[i..].chars().next().ok_or(PathRejection::MalformedEncoding)?;
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        let hex = raw
            .get(i + 1..i + 3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or(PathRejection::MalformedEncoding)?;
        let value = u8::from_str_radix(hex, 16).map_err(|_| PathRejection::MalformedEncoding)?;

        match value {
            b'/' | b'\\' => return Err(PathRejection::AmbiguousSeparator),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(value));
            }
            _ => {
                out.push('%');
                out.push_str(&hex.to_ascii_uppercase());
            }
        }
        i += 3;
    }

    Ok(out)
}
