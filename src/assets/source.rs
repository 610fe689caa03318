use std::{fmt, str::FromStr, sync::Arc};

use base64::Engine as _;

use crate::foundation::error::{BoothError, BoothResult};

/// Where an image comes from: a static asset path or bytes carried inline in a `data:` URI.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// Normalized path relative to the configured asset root.
    Static(String),
    /// Payload decoded from a `data:` URI (camera capture, file upload).
    Inline {
        media_type: Option<String>,
        bytes: Arc<Vec<u8>>,
    },
}

impl ImageSource {
    pub fn parse(reference: &str) -> BoothResult<Self> {
        let trimmed = reference.trim();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "data:") {
            let (media_type, bytes) = parse_data_uri(rest)?;
            return Ok(Self::Inline {
                media_type,
                bytes: Arc::new(bytes),
            });
        }
        Ok(Self::Static(normalize_asset_path(trimmed)?))
    }

    pub fn inline(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Inline {
            media_type: Some(media_type.into()),
            bytes: Arc::new(bytes),
        }
    }

    /// True when the extension or media type names SVG.
    pub fn is_svg_hint(&self) -> bool {
        match self {
            Self::Static(path) => path.to_ascii_lowercase().ends_with(".svg"),
            Self::Inline { media_type, .. } => media_type
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case("image/svg+xml")),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(path) => write!(f, "/{path}"),
            Self::Inline { media_type, bytes } => write!(
                f,
                "data:{};{} bytes",
                media_type.as_deref().unwrap_or("application/octet-stream"),
                bytes.len()
            ),
        }
    }
}

// Inline payloads can be megabytes; keep logs readable.
impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageSource({self})")
    }
}

impl FromStr for ImageSource {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalize a static asset path.
///
/// Web-root paths (`/templates/a.svg`) are treated as relative to the asset root. The result uses
/// `/` separators, drops `.` segments and rejects parent traversals (`..`).
pub fn normalize_asset_path(source: &str) -> BoothResult<String> {
    let s = source.replace('\\', "/");
    if s.trim().is_empty() {
        return Err(BoothError::validation("asset path must be non-empty"));
    }
    if let Some(scheme) = url_scheme(&s) {
        return Err(BoothError::validation(format!(
            "remote '{scheme}://' sources are not supported; use a static path or data URI"
        )));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BoothError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BoothError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Scheme of an absolute URL such as `https://host/a.png`.
fn url_scheme(s: &str) -> Option<&str> {
    let (scheme, _) = s.trim().split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Parse the part of a data URI after `data:` into `(media type, payload)`.
fn parse_data_uri(rest: &str) -> BoothResult<(Option<String>, Vec<u8>)> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| BoothError::validation("data URI is missing ','"))?;

    let mut params = meta.split(';');
    let media_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_ascii_lowercase);
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| BoothError::validation(format!("invalid base64 in data URI: {e}")))?
    } else {
        percent_decode(payload)?
    };

    if bytes.is_empty() {
        return Err(BoothError::validation("data URI payload is empty"));
    }
    Ok((media_type, bytes))
}

fn percent_decode(s: &str) -> BoothResult<Vec<u8>> {
    let raw = s.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| BoothError::validation("invalid percent escape in data URI"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}
