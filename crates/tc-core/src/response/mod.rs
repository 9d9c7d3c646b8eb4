//! Response classification — locate the first JSON value inside raw model output.

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

/// How much of a JSON value the model output contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// No opening `{` or `[` anywhere in the text.
    NoJson,
    /// An opening delimiter was found but the value never closed.
    PartialJson,
    /// A fully balanced JSON value was found.
    CompleteJson,
}

// ---------------------------------------------------------------------------
// JsonResponse
// ---------------------------------------------------------------------------

/// Read-only view over one raw model response.
///
/// Holds the original text, the extracted JSON substring when one was found,
/// and the completeness classification. A partial extraction is kept for
/// diagnostics only; `json_body` exposes a substring solely for complete
/// values.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    raw: String,
    extracted: Option<String>,
    completeness: Completeness,
}

impl JsonResponse {
    /// Scan raw model output for its first JSON value.
    ///
    /// The scanner tolerates surrounding prose (including markdown fences)
    /// and is string-aware: delimiters inside JSON string literals do not
    /// affect balancing.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();

        let Some(start) = raw.find(['{', '[']) else {
            return Self {
                raw,
                extracted: None,
                completeness: Completeness::NoJson,
            };
        };

        match scan_balanced(&raw[start..]) {
            Some(len) => {
                let extracted = raw[start..start + len].to_string();
                Self {
                    raw,
                    extracted: Some(extracted),
                    completeness: Completeness::CompleteJson,
                }
            }
            None => {
                let extracted = raw[start..].to_string();
                Self {
                    raw,
                    extracted: Some(extracted),
                    completeness: Completeness::PartialJson,
                }
            }
        }
    }

    /// The original response text, untouched.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    /// The extracted JSON text, only when it is complete.
    pub fn json_body(&self) -> Option<&str> {
        match self.completeness {
            Completeness::CompleteJson => self.extracted.as_deref(),
            _ => None,
        }
    }

    /// Whatever was extracted, complete or not. Diagnostics only.
    pub fn extracted(&self) -> Option<&str> {
        self.extracted.as_deref()
    }
}

/// Return the byte length of the balanced JSON value at the start of `text`,
/// or `None` when the text ends before the value closes.
fn scan_balanced(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
