//! String utility functions

use once_cell::sync::Lazy;
use regex::Regex;

static LOCALIZED_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<localized hint="[^"]*">"#).expect("valid regex"));
static LOCALIZED_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</localized>").expect("valid regex"));

/// Format a number with thousands separators
pub fn format_number_with_separators(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }

    result
}

/// Format an ISK amount, dropping the fractional part
pub fn format_isk(amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}", format_number_with_separators((-amount) as u64))
    } else {
        format_number_with_separators(amount as u64)
    }
}

/// Parse a price like "1,234,567" as shown by the auction site
pub fn parse_price_text(text: &str) -> Option<u64> {
    let digits: String = text.trim().chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

/// Remove the `<localized hint="...">` wrappers the game client adds to copied text
pub fn strip_localized_markup(text: &str) -> String {
    let opened = LOCALIZED_OPEN.replace_all(text, "");
    LOCALIZED_CLOSE.replace_all(&opened, "").into_owned()
}

/// First number enclosed in square brackets, e.g. `Skyhook [8]` -> 8
pub fn bracketed_number(text: &str) -> Option<u64> {
    let start = text.find('[')?;
    let rest = &text[start + 1..];
    let end = rest.find(']')?;
    rest[..end].trim().parse().ok()
}
