//! Image descriptor selection.
//!
//! Pages imported from the legacy site carry an inline `imageData` block: a JSON object keyed
//! by role (`infobox`, `background`, ...) whose entries name a file, an upload path and the
//! comma-separated size variants that exist for it. Selection walks the preferred roles in
//! order and, for the first usable one, picks the first preferred size that exists.

use std::collections::BTreeMap;

use gamedex_types::{LegacyImage, ResolvedImage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const DEFAULT_PREFERRED_KEYS: [&str; 2] = ["infobox", "background"];

pub const FULL_SIZES: [&str; 4] = [
    "scale_super",
    "screen_kubrick",
    "screen_kubrick_wide",
    "scale_large",
];

pub const THUMB_SIZES: [&str; 6] = [
    "screen_kubrick",
    "screen_medium",
    "scale_medium",
    "scale_large",
    "scale_small",
    "square_medium",
];

static IMAGE_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<div[^>]*id=(?:"imageData"|'imageData')[^>]*data-json=(?:"([^"]*)"|'([^']*)')"#,
    )
    .expect("image data regex should compile")
});

/// One named image entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageDescriptor {
    pub file: String,
    pub path: String,
    /// Comma-separated size tokens, e.g. `"scale_small, scale_large"`.
    pub sizes: String,
    pub caption: Option<String>,
}

impl ImageDescriptor {
    pub fn new(file: &str, path: &str, sizes: &str) -> Self {
        Self {
            file: file.to_string(),
            path: path.to_string(),
            sizes: sizes.to_string(),
            caption: None,
        }
    }

    pub fn available_sizes(&self) -> Vec<&str> {
        self.sizes
            .split(',')
            .map(str::trim)
            .filter(|size| !size.is_empty())
            .collect()
    }

    /// First preferred size that is available, else the first available size.
    pub fn choose_size<'a>(&'a self, preferred: &[&str]) -> Option<&'a str> {
        let available = self.available_sizes();
        preferred
            .iter()
            .find_map(|candidate| available.iter().copied().find(|size| size == candidate))
            .or_else(|| available.first().copied())
    }

    /// Upload URL for the preferred size, or `None` when the entry is incomplete.
    pub fn url(&self, host: &str, preferred: &[&str]) -> Option<String> {
        let file = self.file.trim();
        let path = self.path.trim();
        if file.is_empty() || path.is_empty() {
            return None;
        }
        let size = self.choose_size(preferred)?;
        let host = host.trim_end_matches('/');
        let path = path.trim_matches('/');
        if path.is_empty() {
            Some(format!("{host}/{size}/{file}"))
        } else {
            Some(format!("{host}/{size}/{path}/{file}"))
        }
    }

    fn caption(&self) -> Option<String> {
        self.caption
            .as_deref()
            .filter(|caption| !caption.is_empty())
            .map(str::to_string)
    }
}

/// Pick a single image URL from named descriptors.
pub fn resolve_image(
    descriptors: &BTreeMap<String, ImageDescriptor>,
    preferred_keys: &[&str],
    preferred_sizes: &[&str],
    host: &str,
) -> Option<ResolvedImage> {
    preferred_keys.iter().find_map(|key| {
        let descriptor = descriptors.get(*key)?;
        let url = descriptor.url(host, preferred_sizes)?;
        Some(ResolvedImage {
            url,
            caption: descriptor.caption(),
            source_key: (*key).to_string(),
        })
    })
}

/// Pick full-size and thumbnail URLs from the same descriptor. Either pick stands in for the
/// other when only one size list matches.
pub fn resolve_legacy_image(
    descriptors: &BTreeMap<String, ImageDescriptor>,
    preferred_keys: &[&str],
    full_sizes: &[&str],
    thumb_sizes: &[&str],
    host: &str,
) -> Option<LegacyImage> {
    preferred_keys.iter().find_map(|key| {
        let descriptor = descriptors.get(*key)?;
        let full = descriptor.url(host, full_sizes);
        let thumb = descriptor.url(host, thumb_sizes);
        let (full, thumb) = match (full, thumb) {
            (Some(full), Some(thumb)) => (full, thumb),
            (Some(full), None) => (full.clone(), full),
            (None, Some(thumb)) => (thumb.clone(), thumb),
            (None, None) => return None,
        };
        Some(LegacyImage {
            full,
            thumb,
            caption: descriptor.caption(),
            file: Some(descriptor.file.clone()).filter(|file| !file.is_empty()),
            source_key: (*key).to_string(),
        })
    })
}

/// Extract the `imageData` descriptors from page wikitext.
///
/// Returns `None` when the block is missing, empty or not a JSON object.
pub fn parse_legacy_image_data(text: &str) -> Option<BTreeMap<String, ImageDescriptor>> {
    let captures = IMAGE_DATA.captures(text)?;
    let encoded = captures.get(1).or_else(|| captures.get(2))?.as_str();
    let decoded = decode_html_entities(encoded);
    let raw = decoded.trim();
    if raw.is_empty() {
        return None;
    }

    let Value::Object(entries) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };

    let descriptors = entries
        .into_iter()
        .filter_map(|(key, entry)| {
            let Value::Object(fields) = entry else {
                return None;
            };
            let field = |name: &str| -> Option<String> {
                match fields.get(name)? {
                    Value::String(value) => Some(value.clone()),
                    Value::Number(value) => Some(value.to_string()),
                    _ => None,
                }
            };
            let descriptor = ImageDescriptor {
                file: field("file").unwrap_or_default(),
                path: field("path").unwrap_or_default(),
                sizes: field("sizes").unwrap_or_default(),
                caption: field("caption"),
            };
            Some((key, descriptor))
        })
        .collect();
    Some(descriptors)
}

/// Image URL for a structured image field value.
///
/// Absolute http(s) URLs pass through; bare file names resolve to their `File:` page under
/// `wiki_base_url`.
pub fn resolve_wiki_image_url(value: &str, wiki_base_url: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(trimmed.to_string());
    }
    let file = if lower.starts_with("file:") {
        trimmed.to_string()
    } else {
        format!("File:{trimmed}")
    };
    let base = wiki_base_url.trim_end_matches('/');
    Some(format!("{base}/{}", file.replace(' ', "_")))
}

fn decode_html_entities(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                output.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
