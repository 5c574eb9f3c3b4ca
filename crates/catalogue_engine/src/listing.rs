//! Parsing of HTML directory-listing pages.

use scraper::{Html, Selector};
use url::Url;

/// One child link of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Last path segment without a trailing slash.
    pub name: String,
    pub url: String,
    pub is_dir: bool,
}

/// Collects the direct children linked from a listing page, in page order.
///
/// Sort-order links (`?C=N;O=D`), fragments, the parent directory and
/// anything outside `base_url` are skipped. Duplicate names keep their first
/// occurrence.
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut entries: Vec<ListingEntry> = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(entry) = child_entry(href, base_url) else {
            continue;
        };
        if entries.iter().all(|existing| existing.name != entry.name) {
            entries.push(entry);
        }
    }
    entries
}

fn child_entry(href: &str, base_url: &Url) -> Option<ListingEntry> {
    let url = resolve_url(href, base_url)?;
    let remainder = url.as_str().strip_prefix(base_url.as_str())?;
    if remainder.is_empty() || remainder.contains(['?', '#']) {
        return None;
    }

    let is_dir = remainder.ends_with('/');
    let name = remainder.trim_end_matches('/');
    if name.is_empty() || name.contains('/') {
        return None;
    }

    Some(ListingEntry {
        name: name.to_string(),
        url: url.to_string(),
        is_dir,
    })
}

fn resolve_url(reference: &str, base: &Url) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#')
        || lower.starts_with('?')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
    {
        return None;
    }
    base.join(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = "https://archive.example/tor-package-archive/torbrowser/";

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    #[test]
    fn apache_style_listing_yields_children_in_order() {
        let html = r#"
        <html><body><h1>Index of /tor-package-archive/torbrowser</h1>
        <table>
          <tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
          <tr><td><a href="/tor-package-archive/">Parent Directory</a></td></tr>
          <tr><td><a href="13.0.1/">13.0.1/</a></td></tr>
          <tr><td><a href="old/">old/</a></td></tr>
          <tr><td><a href="README.txt">README.txt</a></td></tr>
        </table></body></html>
        "#;

        let entries = parse_listing(html, &base());
        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    name: "13.0.1".to_string(),
                    url: format!("{BASE}13.0.1/"),
                    is_dir: true,
                },
                ListingEntry {
                    name: "old".to_string(),
                    url: format!("{BASE}old/"),
                    is_dir: true,
                },
                ListingEntry {
                    name: "README.txt".to_string(),
                    url: format!("{BASE}README.txt"),
                    is_dir: false,
                },
            ]
        );
    }

    #[test]
    fn absolute_links_inside_base_are_accepted_and_outside_rejected() {
        let html = format!(
            r#"<a href="{BASE}12.5.6/">x</a><a href="https://elsewhere.example/13.0.1/">y</a><a href="../">up</a><a href="{BASE}">self</a>"#
        );
        let entries = parse_listing(&html, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "12.5.6");
    }

    #[test]
    fn nested_paths_and_duplicates_are_dropped() {
        let html = r##"<a href="a/b.tar.gz">n</a><a href="f.tar.gz">1</a><a href="f.tar.gz">2</a><a href="#top">t</a>"##;
        let entries = parse_listing(html, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "f.tar.gz");
        assert!(!entries[0].is_dir);
    }
}
