use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffixes of signatures, checksums and notes published next to artifacts.
const NOISE_SUFFIXES: &[&str] = &[".asc", ".sig", ".sha256sum", ".txt"];

/// Tokens that mark debug symbols, tooling and listing artefacts.
const NOISE_TOKENS: &[&str] = &[
    "debug",
    "sha256",
    "mar-tools",
    "geckodriver",
    "src-",
    "tmp.mar",
    "index.html",
    "results",
    "sandbox-",
];

const EXPORT_MARKERS: &[&str] = &["tor-expert-bundle", "tor-win32-", "tor-win64-"];
const BROWSER_MARKERS: &[&str] = &["torbrowser", "tor-browser"];

/// Platform tokens in match order; the first group with a hit wins.
const PLATFORM_TOKENS: &[(Platform, &[&str])] = &[
    (Platform::Windows, &["windows", "win32", "win64"]),
    (Platform::Macos, &["macos", "osx", "darwin"]),
    (Platform::Linux, &["linux"]),
    (Platform::Android, &["android"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductLine {
    /// Headless daemon-only distribution (the expert bundle).
    Export,
    /// Full browser installers.
    Browser,
}

impl ProductLine {
    pub const ALL: [ProductLine; 2] = [ProductLine::Export, ProductLine::Browser];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductLine::Export => "export",
            ProductLine::Browser => "browser",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
    Android,
    Unknown,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Windows,
        Platform::Macos,
        Platform::Linux,
        Platform::Android,
        Platform::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macos",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Unknown => "unknown",
        }
    }

    /// Maps a `std::env::consts::OS` value onto a platform tag.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::Macos,
            "linux" => Platform::Linux,
            "android" => Platform::Android,
            _ => Platform::Unknown,
        }
    }

    /// Platform of an archive file name, `Unknown` when no token matches.
    pub fn of_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        PLATFORM_TOKENS
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|token| lower.contains(token)))
            .map(|(platform, _)| *platform)
            .unwrap_or(Platform::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for a single archive file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Signatures, checksums, debug symbols and listing artefacts. Dropped everywhere.
    Noise,
    /// A real file that neither product line claims; only the `all` tier keeps it.
    Unclaimed { platform: Platform },
    Kept {
        product_line: ProductLine,
        platform: Platform,
    },
}

impl Classification {
    pub fn keep(&self) -> bool {
        matches!(self, Classification::Kept { .. })
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, Classification::Noise)
    }

    pub fn product_line(&self) -> Option<ProductLine> {
        match self {
            Classification::Kept { product_line, .. } => Some(*product_line),
            _ => None,
        }
    }

    pub fn platform(&self) -> Option<Platform> {
        match self {
            Classification::Noise => None,
            Classification::Unclaimed { platform } | Classification::Kept { platform, .. } => {
                Some(*platform)
            }
        }
    }
}

/// Classifies an archive file name. Total and deterministic.
pub fn classify(file_name: &str) -> Classification {
    let lower = file_name.to_ascii_lowercase();

    if NOISE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        || NOISE_TOKENS.iter().any(|token| lower.contains(token))
    {
        return Classification::Noise;
    }

    let platform = Platform::of_file_name(&lower);
    let product_line = if EXPORT_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(ProductLine::Export)
    } else if BROWSER_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(ProductLine::Browser)
    } else {
        None
    };

    match product_line {
        Some(product_line) => Classification::Kept {
            product_line,
            platform,
        },
        None => Classification::Unclaimed { platform },
    }
}
