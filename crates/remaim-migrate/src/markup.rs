//! Textile to Remarkup conversion.

use std::sync::LazyLock;

use regex::Regex;

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]+)":(https?://[^\s"<>]+[^\s"<>.,;:!?)])"#).expect("link regex")
});

static STRIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|\s)-([^\s-][^-\n]*?)-($|\s)").expect("strike regex"));

/// Ordered substitution table, applied after links and strike-through.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("\r", ""),
    ("h1.", "="),
    ("h2.", "=="),
    ("h3.", "==="),
    ("h4.", "===="),
    ("<pre>", "```"),
    ("</pre>", "```"),
    ("@", "`"),
    ("*", "**"),
    ("_", "//"),
];

/// Convert Redmine textile into Phabricator Remarkup.
///
/// This is a plain substitution pass, not a parser.
pub fn to_remarkup(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let text = LINK.replace_all(text, "[[$2|$1]]");
    let text = STRIKE.replace_all(&text, "$1~~$2~~$3");

    SUBSTITUTIONS
        .iter()
        .fold(text.into_owned(), |acc, (from, to)| acc.replace(from, to))
}

/// Turn text into a Remarkup quote.
pub fn quote(text: &str) -> String {
    format!("> {}", text.replace('\n', "\n> "))
}
