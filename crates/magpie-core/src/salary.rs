use std::sync::LazyLock;

use regex::Regex;

// Ranges must be anchored by a currency sign or a `k` suffix; bare
// number ranges ("3 - 5 years") are not salaries.
static DOLLAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\$(?P<min>\d[\d,]*)\s*(?P<mink>k)?\s*(?:-|to)\s*\$?(?P<max>\d[\d,]*)\s*(?P<maxk>k)?",
    )
    .expect("valid regex")
});
static BARE_K_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<min>\d+)\s*k\s*(?:-|to)\s*(?P<max>\d+)\s*k").expect("valid regex")
});

/// Pulls an annual salary range out of free text.
///
/// Handles the shapes boards actually use: `$80k - $120k`,
/// `$80,000 - $120,000`, `90k - 120k`, `$80 - $120k`. Returns
/// `(min, max)` with the bounds ordered.
pub fn extract_salary(text: &str) -> Option<(i64, i64)> {
    if let Some(caps) = DOLLAR_RANGE.captures(text) {
        let min_k = caps.name("mink").is_some();
        let max_k = caps.name("maxk").is_some();
        let min = scale(digits(&caps["min"])?, min_k, max_k);
        let max = scale(digits(&caps["max"])?, max_k, min_k);
        return Some(ordered(min, max));
    }
    if let Some(caps) = BARE_K_RANGE.captures(text) {
        let min = digits(&caps["min"])?.checked_mul(1000)?;
        let max = digits(&caps["max"])?.checked_mul(1000)?;
        return Some(ordered(min, max));
    }
    None
}

/// `$80 - $120k` means thousands on both sides; `$80k - $90,000` does not
/// rescale the side already written out in full.
fn scale(value: i64, own_k: bool, other_k: bool) -> i64 {
    if own_k || (other_k && value < 1000) {
        value.saturating_mul(1000)
    } else {
        value
    }
}

fn digits(raw: &str) -> Option<i64> {
    raw.replace(',', "").parse().ok()
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}
