use std::fmt;

use super::{LoadError, Result};

/// A parsed image identifier.
///
/// `scheme:location[?...frame=N...]`, where a string without a scheme is a web image and
/// gets `https:` prepended (`example.org/a.png` and `//example.org/a.png` both resolve to
/// `https://example.org/a.png`). `frame` selects a 0-based frame of a multi-frame object
/// and is removed from the location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageId {
    raw: String,
    scheme: String,
    location: String,
    frame: Option<usize>,
}

impl ImageId {
    pub const DEFAULT_SCHEME: &'static str = "https";

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = || LoadError::InvalidIdentifier(raw.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (scheme, location) = match split_scheme(trimmed) {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest.to_string()),
            None => {
                let rest = trimmed.strip_prefix("//").unwrap_or(trimmed);
                (Self::DEFAULT_SCHEME.to_string(), format!("//{rest}"))
            }
        };
        if location.trim_start_matches('/').is_empty() {
            return Err(invalid());
        }

        let (location, frame) = take_frame_param(&location).ok_or_else(invalid)?;
        Ok(Self {
            raw: trimmed.to_string(),
            scheme,
            location,
            frame,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn frame(&self) -> Option<usize> {
        self.frame
    }

    /// `scheme:location`, without the frame selector.
    pub fn url(&self) -> String {
        format!("{}:{}", self.scheme, self.location)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.raw)
    }
}

fn split_scheme(text: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = text.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    // `C:\scans` is a drive letter and `host:8080/x` is a port, neither is a scheme.
    if !valid || scheme.len() == 1 || rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((scheme, rest))
}

fn take_frame_param(location: &str) -> Option<(String, Option<usize>)> {
    let Some((base, query)) = location.split_once('?') else {
        return Some((location.to_string(), None));
    };

    let mut frame = None;
    let mut kept = Vec::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        match pair.strip_prefix("frame=") {
            Some(value) => frame = Some(value.parse::<usize>().ok()?),
            None => kept.push(pair),
        }
    }

    let location = if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    };
    Some((location, frame))
}
