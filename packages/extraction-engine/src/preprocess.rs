//! Content preprocessing: markup cleanup, token-budget bounding, segmenting.
//!
//! Raw crawled content arrives here before anything is sent to a provider.
//! `clean` turns markup into flowing text an LLM can read, `bound` enforces
//! the provider's token budget, and `segment` splits oversized content into
//! ordered chunks for callers that run multiple sub-extractions.

use tracing::debug;

use crate::types::request::ContentKind;

/// Estimates the token count of a piece of text.
///
/// Exact token counts are tokenizer-specific, so each provider carries its
/// own estimator. Implementations must be cheap: `bound` calls them inside
/// a binary search.
pub trait TokenEstimator: std::fmt::Debug + Send + Sync {
    /// Estimated token count for `text`.
    fn estimate(&self, text: &str) -> usize;
}

/// Character-count heuristic: `ceil(chars / chars_per_token)`.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    chars_per_token: f32,
}

impl HeuristicEstimator {
    /// Create an estimator with the given chars-per-token ratio.
    pub fn new(chars_per_token: f32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(0.1),
        }
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.chars().count() as f32 / self.chars_per_token).ceil() as usize
    }
}

/// Normalize raw content into flowing text.
///
/// Markup input has scripts, styles, comments and tags stripped; tables are
/// linearized into ` | `-separated rows and list items into dashed lines so
/// the structure survives without the clutter. Plain input only gets its
/// whitespace collapsed.
pub fn clean(raw: &str, kind: ContentKind) -> String {
    match kind {
        ContentKind::Markup => clean_markup(raw),
        ContentKind::Plain | ContentKind::Other => collapse_whitespace(raw),
    }
}

fn clean_markup(html: &str) -> String {
    let mut text = html.to_string();

    // Remove scripts, styles and comments entirely
    let script_pattern = regex::Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_pattern = regex::Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let comment_pattern = regex::Regex::new(r"(?s)<!--.*?-->").unwrap();
    text = script_pattern.replace_all(&text, "").to_string();
    text = style_pattern.replace_all(&text, "").to_string();
    text = comment_pattern.replace_all(&text, "").to_string();

    // Linearize tables: cells joined with ` | `, one row per line
    let cell_close = regex::Regex::new(r"(?i)</t[dh]>").unwrap();
    let row_close = regex::Regex::new(r"(?i)</tr>").unwrap();
    text = cell_close.replace_all(&text, " | ").to_string();
    text = row_close.replace_all(&text, "\n").to_string();

    // List items become dashed lines
    let li_open = regex::Regex::new(r"(?i)<li[^>]*>").unwrap();
    let li_close = regex::Regex::new(r"(?i)</li>").unwrap();
    text = li_open.replace_all(&text, "- ").to_string();
    text = li_close.replace_all(&text, "\n").to_string();

    // Block-level boundaries become newlines
    let block_close =
        regex::Regex::new(r"(?i)</(p|div|h[1-6]|ul|ol|table|section|article|blockquote)>")
            .unwrap();
    let br_pattern = regex::Regex::new(r"(?i)<br\s*/?>").unwrap();
    text = block_close.replace_all(&text, "\n").to_string();
    text = br_pattern.replace_all(&text, "\n").to_string();

    // Strip remaining tags
    let tag_pattern = regex::Regex::new(r"<[^>]+>").unwrap();
    text = tag_pattern.replace_all(&text, " ").to_string();

    // Decode HTML entities
    text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    let spaces = regex::Regex::new(r"[ \t]+").unwrap();
    let line_edges = regex::Regex::new(r" ?\n ?").unwrap();
    let newlines = regex::Regex::new(r"\n{3,}").unwrap();

    let mut out = spaces.replace_all(text, " ").to_string();
    out = line_edges.replace_all(&out, "\n").to_string();
    out = newlines.replace_all(&out, "\n\n").to_string();
    out.trim().to_string()
}

/// Truncate `text` so its estimated token count never exceeds `token_budget`.
///
/// Cuts at a whitespace boundary where possible rather than mid-word. The
/// returned text always satisfies `estimator.estimate(..) <= token_budget`,
/// even for non-monotone estimators.
pub fn bound(text: &str, token_budget: usize, estimator: &dyn TokenEstimator) -> String {
    if estimator.estimate(text) <= token_budget {
        return text.to_string();
    }

    let mut end = prefix_within_budget(text, token_budget, estimator);

    // Back off to the last whitespace so the cut lands between words
    if end < text.len() {
        if let Some(pos) = text[..end].rfind(|c: char| c.is_whitespace()) {
            if pos > 0 {
                end = pos;
            }
        }
    }

    let mut out = text[..end].trim_end();
    // The search assumes a monotone estimator; enforce the budget either way
    while !out.is_empty() && estimator.estimate(out) > token_budget {
        out = match out.rfind(|c: char| c.is_whitespace()) {
            Some(pos) => out[..pos].trim_end(),
            None => "",
        };
    }

    debug!(
        budget = token_budget,
        chars_before = text.chars().count(),
        chars_after = out.chars().count(),
        "content truncated to token budget"
    );
    out.to_string()
}

/// Largest char-boundary prefix of `text` whose estimate fits `budget`.
fn prefix_within_budget(text: &str, budget: usize, estimator: &dyn TokenEstimator) -> usize {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let (mut lo, mut hi) = (0usize, boundaries.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if estimator.estimate(&text[..boundaries[mid]]) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    boundaries[lo]
}

/// Split `text` into ordered segments of at most `max_segment_tokens` each.
///
/// The iterator is finite and restartable: `segment` is cheap to call again,
/// and the iterator itself is `Clone`. Splits prefer paragraph boundaries,
/// then line breaks, then word boundaries. A single word larger than the
/// budget is hard-cut so iteration always makes progress.
pub fn segment<'a>(
    text: &'a str,
    max_segment_tokens: usize,
    estimator: &'a dyn TokenEstimator,
) -> Segments<'a> {
    Segments {
        remaining: text.trim(),
        max_tokens: max_segment_tokens,
        estimator,
    }
}

/// Lazy iterator over content segments. See [`segment`].
#[derive(Clone)]
pub struct Segments<'a> {
    remaining: &'a str,
    max_tokens: usize,
    estimator: &'a dyn TokenEstimator,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.remaining.is_empty() {
            return None;
        }

        if self.estimator.estimate(self.remaining) <= self.max_tokens {
            let last = self.remaining;
            self.remaining = "";
            return Some(last);
        }

        let fitted = prefix_within_budget(self.remaining, self.max_tokens, self.estimator);
        let prefix = &self.remaining[..fitted];

        let mut end = if let Some(pos) = prefix.rfind("\n\n") {
            pos
        } else if let Some(pos) = prefix.rfind('\n') {
            pos
        } else if let Some(pos) = prefix.rfind(' ') {
            pos
        } else {
            fitted
        };

        // Oversized single word: cut after the first char rather than stall
        if end == 0 {
            end = self
                .remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(self.remaining.len());
        }

        let segment = self.remaining[..end].trim_end();
        self.remaining = self.remaining[end..].trim_start();
        Some(segment)
    }
}
