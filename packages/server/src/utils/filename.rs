use std::path::Path;

/// Result of validating an uploaded filename.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains null bytes.
    NullByte,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Extension is not `.zip`.
    NotZip,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::NotZip => "Only .zip files allowed",
        }
    }
}

/// Validates the declared filename of an upload and returns its final path
/// component.
///
/// Browsers may send a full client-side path; only the last component is
/// kept. The extension check is case-insensitive.
pub fn validate_zip_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // Reject ASCII control characters to prevent
    // HTTP header injection (e.g. CRLF in Content-Disposition).
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .trim();
    if base.is_empty() {
        return Err(FilenameError::Empty);
    }

    let is_zip = Path::new(base)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let has_stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| !s.is_empty() && s != ".");
    if !is_zip || !has_stem {
        return Err(FilenameError::NotZip);
    }

    Ok(base)
}

/// Filename offered to the client for a project download: the title with a
/// single `.zip` suffix.
pub fn download_filename(title: &str) -> String {
    let title = title.trim();
    let split = title.len().checked_sub(4).filter(|&i| {
        title
            .get(i..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".zip"))
    });
    let stem = match split {
        Some(i) => &title[..i],
        None => title,
    };
    let stem = stem.trim();
    if stem.is_empty() {
        "download.zip".to_string()
    } else {
        format!("{stem}.zip")
    }
}

/// Build a safe `Content-Disposition: attachment` header value.
pub fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_safe = ascii_safe.trim();
    let ascii_name = if ascii_safe.is_empty() || ascii_safe.starts_with('.') {
        "download.zip"
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
