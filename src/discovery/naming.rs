//! Resource naming and label parsing

/// Base name used when a device name has no usable characters
pub const FALLBACK_NAME: &str = "webcam";

/// Reduce a raw device name to ASCII letters and digits.
///
/// Semicolons are first turned into hyphens, which are then stripped along
/// with every other non-alphanumeric character.
pub fn sanitize_name(raw: &str) -> String {
    raw.replace(';', "-")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Base name for a device: its sanitized name, or the fallback token.
///
/// `position` is the device's place in the enumeration; when given, unnamed
/// devices become `webcam-<position>` so two of them cannot collide.
pub fn base_name(raw: &str, position: Option<usize>) -> String {
    let sanitized = sanitize_name(raw);
    if !sanitized.is_empty() {
        return sanitized;
    }
    match position {
        Some(position) => format!("{FALLBACK_NAME}-{position}"),
        None => FALLBACK_NAME.to_string(),
    }
}

/// Name for the `index`-th descriptor out of `count` produced by one device
pub fn descriptor_name(base: &str, index: usize, count: usize) -> String {
    if count > 1 {
        format!("{base}-{index}")
    } else {
        base.to_string()
    }
}

/// Access path encoded in a driver label.
///
/// Labels are either a bare path or `name<separator>path`; only the first two
/// parts are consulted.
pub fn extract_path<'a>(label: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return label;
    }
    let mut parts = label.split(separator);
    let first = parts.next().unwrap_or(label);
    parts.next().unwrap_or(first)
}
