use std::sync::Once;

use catalogue_core::{
    classify, CacheTier, Catalogue, FileEntry, Platform, ProductLine, Tier, Version,
};
use pretty_assertions::assert_eq;

const BASE: &str = "https://archive.example/torbrowser";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(catalogue_logging::initialize_for_tests);
}

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn entry(version: &str, name: &str) -> FileEntry {
    FileEntry::new(name, format!("{BASE}/{version}/{name}"))
}

/// Mirrors what the scrape pipeline does with one observed directory listing.
fn observe(tiers: &mut [CacheTier; 3], version: &str, names: &[&str]) {
    for (tier_kind, tier) in Tier::ALL.iter().zip(tiers.iter_mut()) {
        let observed: Vec<FileEntry> = names
            .iter()
            .filter(|name| tier_kind.admits(&classify(name)))
            .map(|name| entry(version, name))
            .collect();
        tier.merge(&v(version), &observed);
    }
}

fn build(tiers: &[CacheTier; 3]) -> Catalogue {
    Catalogue::build(&tiers[0], &tiers[1], &tiers[2])
}

#[test]
fn signature_is_dropped_and_bundle_lands_in_windows_group() {
    init_logging();
    let mut tiers: [CacheTier; 3] = Default::default();
    observe(
        &mut tiers,
        "13.0.1",
        &[
            "tor-expert-bundle-13.0.1-windows-x86_64.tar.gz",
            "tor-expert-bundle-13.0.1-windows-x86_64.tar.gz.asc",
        ],
    );

    let catalogue = build(&tiers);
    let bundle = entry("13.0.1", "tor-expert-bundle-13.0.1-windows-x86_64.tar.gz");

    assert_eq!(catalogue.export.records.len(), 1);
    assert_eq!(catalogue.export.records[0].version, v("13.0.1"));
    assert_eq!(catalogue.export.records[0].files, vec![bundle.clone()]);
    assert_eq!(catalogue.export.grouped.get(Platform::Windows), &[bundle]);
    assert_eq!(catalogue.export.grouped.total(), 1);
    assert!(catalogue.browser.records.is_empty());
    assert_eq!(catalogue.browser.blanks, vec![v("13.0.1")]);
}

#[test]
fn directory_with_only_noise_is_blank_everywhere() {
    init_logging();
    let mut tiers: [CacheTier; 3] = Default::default();
    observe(
        &mut tiers,
        "13.0.1",
        &["tor-expert-bundle-13.0.1-linux-x86_64.tar.gz"],
    );
    observe(
        &mut tiers,
        "13.0.2",
        &["sha256sums-signed-build.txt", "sha256sums-signed-build.txt.asc"],
    );

    let catalogue = build(&tiers);
    assert_eq!(catalogue.versions, vec![v("13.0.1"), v("13.0.2")]);
    let blanks = catalogue.blanks();
    assert_eq!(blanks.export, vec![v("13.0.2")]);
    assert_eq!(blanks.browser, vec![v("13.0.1"), v("13.0.2")]);

    for line in ProductLine::ALL {
        let product = catalogue.product(line);
        assert!(product.records.iter().all(|r| r.version != v("13.0.2")));
        for platform in Platform::ALL {
            assert!(product
                .grouped
                .get(platform)
                .iter()
                .all(|f| !f.url.contains("/13.0.2/")));
        }
    }
}

#[test]
fn records_are_in_numeric_version_order_and_latest_is_highest() {
    init_logging();
    let mut tiers: [CacheTier; 3] = Default::default();
    for version in ["13.0.10", "9.5.1", "13.0.9"] {
        let name = format!("tor-browser-linux-x86_64-{version}.tar.xz");
        observe(&mut tiers, version, &[name.as_str()]);
    }

    let catalogue = build(&tiers);
    let order: Vec<String> = catalogue
        .browser
        .records
        .iter()
        .map(|r| r.version.to_string())
        .collect();
    assert_eq!(order, vec!["9.5.1", "13.0.9", "13.0.10"]);
    assert_eq!(catalogue.browser.latest.version, Some(v("13.0.10")));
    assert_eq!(catalogue.export.latest.version, None);
    assert!(catalogue.export.latest.files.is_empty());
}

#[test]
fn daemon_fields_only_appear_in_daemon_projections() {
    init_logging();
    let mut tiers: [CacheTier; 3] = Default::default();
    let name = "tor-expert-bundle-13.0.1-linux-x86_64.tar.gz";
    observe(&mut tiers, "13.0.1", &[name]);
    tiers[1].record_daemon(&v("13.0.1"), name, &v("0.4.8.9"), Some("abcd"));

    let catalogue = build(&tiers);
    assert_eq!(catalogue.export.records[0].files[0].daemon_version, None);
    assert_eq!(catalogue.export.grouped.linux[0].daemon_version, None);
    assert_eq!(
        catalogue.export.daemon_records[0].files[0].daemon_version,
        Some(v("0.4.8.9"))
    );
    assert_eq!(
        catalogue.export.latest.files[0].daemon_hash.as_deref(),
        Some("abcd")
    );
}

#[test]
fn rebuilding_unchanged_state_is_identical() {
    init_logging();
    let mut tiers: [CacheTier; 3] = Default::default();
    observe(
        &mut tiers,
        "12.5.6",
        &[
            "tor-browser-android-aarch64-12.5.6.apk",
            "tor-expert-bundle-12.5.6-macos-x86_64.tar.gz",
            "tor-expert-bundle-12.5.6.tar.gz",
        ],
    );

    let first = build(&tiers);
    observe(
        &mut tiers,
        "12.5.6",
        &[
            "tor-browser-android-aarch64-12.5.6.apk",
            "tor-expert-bundle-12.5.6-macos-x86_64.tar.gz",
            "tor-expert-bundle-12.5.6.tar.gz",
        ],
    );
    let second = build(&tiers);

    assert_eq!(first, second);
    assert_eq!(first.export.grouped.unknown.len(), 1);
    assert_eq!(first.browser.grouped.android.len(), 1);
}

#[test]
fn grouped_view_serialises_in_fixed_key_order() {
    init_logging();
    let catalogue = build(&Default::default());
    let json = serde_json::to_string(&catalogue.export.grouped).unwrap();
    assert_eq!(
        json,
        r#"{"windows":[],"macos":[],"linux":[],"android":[],"unknown":[]}"#
    );
}
