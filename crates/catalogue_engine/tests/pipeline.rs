use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use catalogue_core::Version;
use catalogue_engine::{
    rebuild_catalogue, run_scrape, ArchiveScraper, CacheError, CacheStore, DataPaths,
    EngineConfig, EngineHandle, FetchSettings, PipelineError, ReqwestFetcher, BLANKS,
    BROWSER_VERSIONS, EXPORT_VERSIONS, EXPORT_VERSIONS_GROUPED, LATEST_EXPORT_VERSIONS,
    VERSIONS_LIST,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXPERT_WIN: &str = "tor-expert-bundle-windows-x86_64-13.0.1.tar.gz";
const BROWSER_LINUX: &str = "tor-browser-linux-x86_64-13.0.1.tar.xz";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(catalogue_logging::initialize_for_tests);
}

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn listing(links: &[&str]) -> String {
    let rows: String = links
        .iter()
        .map(|link| format!("<tr><td><a href=\"{link}\">{link}</a></td></tr>\n"))
        .collect();
    format!(
        "<html><head><title>Index of /torbrowser</title></head><body><table>\n\
         <tr><th><a href=\"?C=N;O=D\">Name</a></th></tr>\n{rows}</table></body></html>"
    )
}

async fn mount_listing(server: &MockServer, at: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(listing(links), "text/html;charset=UTF-8"),
        )
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer) {
    mount_listing(
        server,
        "/torbrowser/",
        &["../", "13.0.1/", "13.0.2/", "13.5a1/", "old/"],
    )
    .await;
    mount_listing(
        server,
        "/torbrowser/13.0.1/",
        &[
            "../",
            EXPERT_WIN,
            &format!("{EXPERT_WIN}.asc"),
            BROWSER_LINUX,
            "sha256sums-signed-build.txt",
            "mar-tools-linux64.zip",
        ],
    )
    .await;
    mount_listing(
        server,
        "/torbrowser/13.0.2/",
        &["../", "sha256sums-unsigned-build.txt", "tor-browser.asc"],
    )
    .await;
}

async fn scrape_once(
    server: &MockServer,
    paths: &DataPaths,
) -> Result<catalogue_engine::ScrapeReport, PipelineError> {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let scraper = ArchiveScraper::new(&fetcher, &format!("{}/torbrowser", server.uri()))
        .expect("base url");
    let mut store = CacheStore::open(paths.clone())?;
    let report = run_scrape(&scraper, &mut store, 1).await?;
    rebuild_catalogue(&store, &paths.json_dir())?;
    Ok(report)
}

fn read_json(dir: &Path, name: &str) -> Value {
    let content = fs::read_to_string(dir.join(name)).unwrap();
    assert!(content.ends_with('\n'), "{name} is not newline terminated");
    serde_json::from_str(&content).unwrap()
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, String)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let content = fs::read_to_string(&path).unwrap();
            (path, content)
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn scrape_builds_every_projection() {
    init_logging();
    let server = MockServer::start().await;
    mount_archive(&server).await;
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());

    let report = scrape_once(&server, &paths).await.unwrap();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.fetched, vec![v("13.0.1"), v("13.0.2")]);
    assert!(report.failed.is_empty());

    let json_dir = paths.json_dir();
    let expert_url = format!("{}/torbrowser/13.0.1/{EXPERT_WIN}", server.uri());
    let browser_url = format!("{}/torbrowser/13.0.1/{BROWSER_LINUX}", server.uri());

    assert_eq!(read_json(&json_dir, VERSIONS_LIST), json!(["13.0.1", "13.0.2"]));
    assert_eq!(
        read_json(&json_dir, EXPORT_VERSIONS),
        json!([{ "version": "13.0.1", "files": [{ "file_name": EXPERT_WIN, "url": expert_url }] }])
    );
    assert_eq!(
        read_json(&json_dir, BROWSER_VERSIONS),
        json!([{ "version": "13.0.1", "files": [{ "file_name": BROWSER_LINUX, "url": browser_url }] }])
    );
    assert_eq!(
        read_json(&json_dir, EXPORT_VERSIONS_GROUPED),
        json!({
            "windows": [{ "file_name": EXPERT_WIN, "url": expert_url }],
            "macos": [],
            "linux": [],
            "android": [],
            "unknown": []
        })
    );
    assert_eq!(
        read_json(&json_dir, BLANKS),
        json!({ "export": ["13.0.2"], "browser": ["13.0.2"] })
    );
    assert_eq!(
        read_json(&json_dir, LATEST_EXPORT_VERSIONS),
        json!({ "version": "13.0.1", "files": [{ "file_name": EXPERT_WIN, "url": expert_url }] })
    );

    // The all tier keeps unclaimed files but never noise.
    let all: Value = serde_json::from_str(
        &fs::read_to_string(paths.cache_dir().join("all/13.0.1.json")).unwrap(),
    )
    .unwrap();
    let names: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["file_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec![EXPERT_WIN, BROWSER_LINUX]);
}

#[tokio::test]
async fn rerun_skips_cached_versions_and_rewrites_identical_output() {
    init_logging();
    let server = MockServer::start().await;
    mount_archive(&server).await;
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());

    scrape_once(&server, &paths).await.unwrap();
    let first = snapshot(&paths.json_dir());

    let report = scrape_once(&server, &paths).await.unwrap();
    assert_eq!(report.cached, 1);
    assert_eq!(report.fetched, vec![v("13.0.2")]);
    assert_eq!(report.files_added, 0);
    assert_eq!(snapshot(&paths.json_dir()), first);
}

#[tokio::test]
async fn failing_version_directory_is_skipped() {
    init_logging();
    let server = MockServer::start().await;
    mount_listing(&server, "/torbrowser/", &["13.0.1/", "13.0.2/"]).await;
    mount_listing(&server, "/torbrowser/13.0.1/", &[EXPERT_WIN]).await;
    Mock::given(method("GET"))
        .and(path("/torbrowser/13.0.2/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());

    let report = scrape_once(&server, &paths).await.unwrap();
    assert_eq!(report.fetched, vec![v("13.0.1")]);
    assert_eq!(report.failed, vec![v("13.0.2")]);
    assert_eq!(read_json(&paths.json_dir(), VERSIONS_LIST), json!(["13.0.1"]));
    assert!(!paths.cache_dir().join("all/13.0.2.json").exists());
}

#[tokio::test]
async fn top_level_listing_failure_fails_the_run() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/torbrowser/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());

    let err = scrape_once(&server, &paths).await.unwrap_err();
    assert!(matches!(err, PipelineError::Listing(_)));
    assert!(!paths.json_dir().exists());
}

#[test]
fn corrupt_cache_stops_before_any_write() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());
    fs::create_dir_all(paths.cache_dir().join("export")).unwrap();
    fs::write(paths.cache_dir().join("export/13.0.1.json"), "[{ not json").unwrap();
    fs::create_dir_all(paths.json_dir()).unwrap();
    fs::write(paths.json_dir().join(VERSIONS_LIST), "previous\n").unwrap();

    let mut config = EngineConfig::default_with_data_dir(temp.path().to_path_buf());
    config.base_url = "http://127.0.0.1:9/torbrowser/".to_string();
    let engine = EngineHandle::new(config).unwrap();

    let err = engine.scrape().unwrap_err();
    assert!(matches!(err, PipelineError::Cache(CacheError::Corrupt { .. })));
    assert_eq!(
        fs::read_to_string(paths.json_dir().join(VERSIONS_LIST)).unwrap(),
        "previous\n"
    );
}

#[test]
fn rebuild_reads_cache_only() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let paths = DataPaths::new(temp.path());
    for tier in ["all", "export"] {
        fs::create_dir_all(paths.cache_dir().join(tier)).unwrap();
        fs::write(
            paths.cache_dir().join(format!("{tier}/12.5.6.json")),
            r#"[{"file_name": "tor-expert-bundle-12.5.6-linux-x86_64.tar.gz", "url": "https://archive.example/12.5.6/tor-expert-bundle-12.5.6-linux-x86_64.tar.gz", "daemon_version": "0.4.7.16"}]"#,
        )
        .unwrap();
    }

    let engine =
        EngineHandle::new(EngineConfig::default_with_data_dir(temp.path().to_path_buf())).unwrap();
    let catalogue = engine.rebuild().unwrap();
    assert_eq!(catalogue.versions, vec![v("12.5.6")]);
    assert_eq!(catalogue.browser.blanks, vec![v("12.5.6")]);

    // Daemon fields appear only in the daemon-enriched projections.
    let plain = fs::read_to_string(paths.json_dir().join(EXPORT_VERSIONS)).unwrap();
    assert!(!plain.contains("daemon_version"));
    let latest = read_json(&paths.json_dir(), LATEST_EXPORT_VERSIONS);
    assert_eq!(latest["files"][0]["daemon_version"], json!("0.4.7.16"));
}
