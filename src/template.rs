//! request template with placeholder markers and per-request substitution
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// a fully substituted request, ready to hand to the transport
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// target url with every marker substituted
    pub url: String,

    /// form body assembled from the body parameter templates, if any
    pub body: Option<String>,

    /// header name/value pairs with markers substituted
    pub headers: Vec<(String, String)>,
}

/// url, body, and header templates of the request-to-be
///
/// each field may contain placeholder markers; the template knows how many
/// markers each field has and substitutes values into them left to right.
/// immutable once the engine starts
///
/// # Examples
///
/// ```
/// # use strikefuzz::template::FuzzTemplate;
/// let mut template = FuzzTemplate::new("http://example.com/FUZZ", "FUZZ");
/// template.add_header("X-Custom: FUZZ");
///
/// assert_eq!(template.total_placeholders(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FuzzTemplate {
    url: String,
    body_params: Vec<String>,
    headers: Vec<String>,
    marker: String,

    // per-field marker counts, computed as fields are added so that static
    // fields can skip substitution entirely
    url_markers: usize,
    body_markers: Vec<usize>,
    header_markers: Vec<usize>,
}

impl FuzzTemplate {
    /// create a template for the given target url and marker token
    #[must_use]
    pub fn new(url: &str, marker: &str) -> Self {
        Self {
            url: url.to_string(),
            body_params: Vec::new(),
            headers: Vec::new(),
            marker: marker.to_string(),
            url_markers: placeholder_count(url, marker),
            body_markers: Vec::new(),
            header_markers: Vec::new(),
        }
    }

    /// append a body parameter template, e.g. `username=FUZZ`
    pub fn add_body_param(&mut self, param: &str) {
        self.body_markers.push(placeholder_count(param, &self.marker));
        self.body_params.push(param.to_string());
    }

    /// append a header template, e.g. `Authorization: Bearer FUZZ`
    pub fn add_header(&mut self, header: &str) {
        self.header_markers
            .push(placeholder_count(header, &self.marker));
        self.headers.push(header.to_string());
    }

    /// total marker count across the url, every body parameter, and every
    /// header; the engine registers exactly this many word cursors
    #[must_use]
    pub fn total_placeholders(&self) -> usize {
        self.url_markers
            + self.body_markers.iter().sum::<usize>()
            + self.header_markers.iter().sum::<usize>()
    }

    /// the marker token this template substitutes
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// the raw (unsubstituted) target url
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// substitute `values` into every templated field, left to right across
    /// the url, then body parameters, then headers, consuming one value per
    /// marker occurrence from a shared cursor
    ///
    /// if more markers remain than values were supplied, the remaining
    /// markers are left verbatim; the mismatch is a configuration problem
    /// signalled upstream, never a crash here
    #[must_use]
    #[instrument(skip_all, level = "trace")]
    pub fn instantiate(&self, values: &[Vec<u8>]) -> ResolvedRequest {
        let mut consumed = 0;

        let url = if self.url_markers == 0 {
            self.url.clone()
        } else {
            substitute(&self.url, &self.marker, values, &mut consumed)
        };

        let body = if self.body_params.is_empty() {
            None
        } else {
            let parts: Vec<String> = self
                .body_params
                .iter()
                .zip(&self.body_markers)
                .map(|(param, &markers)| {
                    if markers == 0 {
                        param.clone()
                    } else {
                        substitute(param, &self.marker, values, &mut consumed)
                    }
                })
                .collect();

            Some(parts.join("&"))
        };

        let headers = self
            .headers
            .iter()
            .zip(&self.header_markers)
            .map(|(header, &markers)| {
                let resolved = if markers == 0 {
                    header.clone()
                } else {
                    substitute(header, &self.marker, values, &mut consumed)
                };

                split_header(&resolved)
            })
            .collect();

        ResolvedRequest { url, body, headers }
    }
}

/// count non-overlapping occurrences of `marker` in `field`
#[must_use]
pub fn placeholder_count(field: &str, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }

    field.matches(marker).count()
}

// walk `field` left to right, replacing each marker occurrence with the next
// unconsumed value; markers with no value left are kept verbatim
fn substitute(field: &str, marker: &str, values: &[Vec<u8>], consumed: &mut usize) -> String {
    let mut resolved = String::with_capacity(field.len());
    let mut remainder = field;

    while let Some(position) = remainder.find(marker) {
        let Some(value) = values.get(*consumed) else {
            // ran out of values; the rest of the field is passed through
            break;
        };

        resolved.push_str(&remainder[..position]);
        resolved.push_str(&String::from_utf8_lossy(value));

        *consumed += 1;
        remainder = &remainder[position + marker.len()..];
    }

    resolved.push_str(remainder);

    resolved
}

// split a resolved `Name: value` header template into its pair; a template
// without a colon becomes a valueless header
fn split_header(header: &str) -> (String, String) {
    header.split_once(':').map_or_else(
        || (header.trim().to_string(), String::new()),
        |(name, value)| (name.trim().to_string(), value.trim().to_string()),
    )
}
