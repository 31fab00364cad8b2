//! Text cleanup applied before scoring.

use std::sync::LazyLock;

use regex::Regex;

/// Mentions made only of ASCII letters. `@user123` therefore keeps its
/// digits after normalization.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z]+").expect("valid mention regex"));

/// Strip topic markers and mentions from message text.
///
/// Every `#` is removed while the word after it is kept. Mentions are
/// removed entirely, leaving the surrounding whitespace untouched. URLs
/// pass through unchanged. The result may be empty.
#[must_use]
pub fn normalize(text: &str) -> String {
    let without_markers = text.replace('#', "");
    MENTION_RE.replace_all(&without_markers, "").into_owned()
}
