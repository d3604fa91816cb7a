use std::sync::Arc;

use htmd::HtmlToMarkdown;

/// Turns HTML job descriptions into readable plain text.
///
/// Feed and board descriptions frequently arrive as HTML fragments.
/// Non-content elements are dropped, the rest becomes Markdown-ish text,
/// and runs of blank lines are collapsed. Input that does not look like
/// markup passes through untouched apart from whitespace cleanup.
pub struct DescriptionCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for DescriptionCleaner {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl Default for DescriptionCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptionCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }

    /// Cleans one description; falls back to the raw text when conversion
    /// fails, so a bad fragment never loses the posting.
    pub fn clean(&self, text: &str) -> String {
        if !text.contains('<') {
            return collapse_blank_runs(text);
        }
        match self.converter.convert(text) {
            Ok(markdown) => collapse_blank_runs(&markdown),
            Err(error) => {
                tracing::debug!(%error, "HTML cleanup failed, keeping raw text");
                collapse_blank_runs(text)
            }
        }
    }
}

/// Collapses runs of blank lines down to a single blank line and trims
/// trailing space per line.
fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out.trim().to_string()
}
