use std::sync::LazyLock;

use regex::Regex;

use crate::Version;

/// Product name that precedes the version in `tor --version` output.
pub const DAEMON_MARKER: &str = "Tor version";

static DOTTED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("dotted run regex"));

static MARKED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){}\s+(\d+(?:\.\d+)+)",
        regex::escape(DAEMON_MARKER)
    ))
    .expect("marked run regex")
});

/// One step of the fallback hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Four components directly after [`DAEMON_MARKER`].
    MarkedFourPart,
    /// Four components anywhere in the text.
    FourPart,
    /// Three components anywhere in the text.
    ThreePart,
}

const DAEMON_ORDER: &[Pattern] = &[Pattern::MarkedFourPart, Pattern::FourPart, Pattern::ThreePart];
const ARCHIVE_ORDER: &[Pattern] = &[Pattern::FourPart, Pattern::ThreePart];

/// Extracts dotted versions from free text using an ordered list of patterns.
///
/// Earlier patterns take strict precedence: the first pattern with any match
/// decides the result, and within that pattern the leftmost match wins.
/// Dotted runs are always taken whole, so `1.2.3.4` never yields `1.2.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMatcher {
    order: &'static [Pattern],
}

impl VersionMatcher {
    /// Ordering for self-reported daemon versions: marker, then 4-part, then 3-part.
    pub const fn daemon() -> Self {
        Self {
            order: DAEMON_ORDER,
        }
    }

    /// Ordering for archive directory names, which carry no product marker.
    pub const fn archive() -> Self {
        Self {
            order: ARCHIVE_ORDER,
        }
    }

    pub const fn with_order(order: &'static [Pattern]) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &'static [Pattern] {
        self.order
    }

    pub fn extract(&self, text: &str) -> Option<Version> {
        self.order
            .iter()
            .find_map(|pattern| match_pattern(*pattern, text))
    }

    /// Like [`extract`](Self::extract) but only accepts text that is nothing
    /// except the version itself (surrounding whitespace and a trailing `/`
    /// are tolerated).
    pub fn extract_exact(&self, text: &str) -> Option<Version> {
        let trimmed = text.trim().trim_end_matches('/');
        self.extract(trimmed)
            .filter(|version| version.to_string() == trimmed)
    }
}

impl Default for VersionMatcher {
    fn default() -> Self {
        Self::daemon()
    }
}

/// Extracts a version using the daemon ordering.
pub fn extract(text: &str) -> Option<Version> {
    VersionMatcher::daemon().extract(text)
}

fn match_pattern(pattern: Pattern, text: &str) -> Option<Version> {
    match pattern {
        Pattern::MarkedFourPart => MARKED_RUN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|run| parse_run(run.as_str(), 4)),
        Pattern::FourPart => first_run_with(text, 4),
        Pattern::ThreePart => first_run_with(text, 3),
    }
}

fn first_run_with(text: &str, components: usize) -> Option<Version> {
    DOTTED_RUN
        .find_iter(text)
        .find_map(|run| parse_run(run.as_str(), components))
}

fn parse_run(run: &str, components: usize) -> Option<Version> {
    if run.split('.').count() != components {
        return None;
    }
    run.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn daemon_output_prefers_four_part_after_marker() {
        assert_eq!(
            extract("Tor version 0.4.8.13 (git-abc)."),
            Some(v("0.4.8.13"))
        );
    }

    #[test]
    fn marker_match_beats_earlier_bare_match() {
        let text = "libevent 2.1.12.1 loaded\nTor version 0.4.8.9.";
        assert_eq!(extract(text), Some(v("0.4.8.9")));
    }

    #[test]
    fn four_part_beats_three_part_regardless_of_position() {
        assert_eq!(
            extract("bundle 13.0.1 ships daemon 0.4.8.7"),
            Some(v("0.4.8.7"))
        );
    }

    #[test]
    fn falls_back_to_three_part() {
        assert_eq!(extract("release 13.0.1 notes"), Some(v("13.0.1")));
    }

    #[test]
    fn longer_runs_are_never_truncated() {
        let matcher = VersionMatcher::with_order(&[Pattern::ThreePart]);
        assert_eq!(matcher.extract("0.4.8.13"), None);
        assert_eq!(extract("1.2.3.4.5"), None);
    }

    #[test]
    fn absent_when_nothing_matches() {
        assert_eq!(extract("no digits here"), None);
        assert_eq!(extract("only 1.2 here"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn exact_rejects_extra_characters() {
        let matcher = VersionMatcher::archive();
        assert_eq!(matcher.extract_exact("13.0.1/"), Some(v("13.0.1")));
        assert_eq!(matcher.extract_exact("12.5.6.1"), Some(v("12.5.6.1")));
        assert_eq!(matcher.extract_exact("13.5a1"), None);
        assert_eq!(matcher.extract_exact("13.0.1-build2"), None);
        assert_eq!(matcher.extract_exact("old"), None);
        assert_eq!(matcher.extract_exact("13.0"), None);
    }
}
