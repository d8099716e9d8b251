//! Type universe loading from files, directories, strings and HTTP URLs.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;
use crate::universe::Universe;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a type universe from a file, or from a directory holding exactly one
/// `.json` file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the path doesn't exist,
/// `LoadError::NoUniverse` / `LoadError::AmbiguousUniverse` when a directory
/// holds zero or several candidates, or the errors of
/// [`Universe::from_document`].
pub fn load_universe(path: &Path) -> Result<Universe, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = if path.is_dir() {
        single_candidate(path)?
    } else {
        path.to_path_buf()
    };

    let content = std::fs::read_to_string(&file).map_err(|source| LoadError::ReadError {
        path: file.clone(),
        source,
    })?;

    load_universe_str(&content)
}

/// Load a type universe from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON, or the
/// errors of [`Universe::from_document`].
pub fn load_universe_str(content: &str) -> Result<Universe, LoadError> {
    let doc: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    Universe::from_document(&doc)
}

/// Load a type universe from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or the errors of
/// [`Universe::from_document`].
#[cfg(feature = "remote")]
pub fn load_universe_url(url: &str) -> Result<Universe, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let doc: Value = response.json().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    Universe::from_document(&doc)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a type universe from a file path, directory or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_universe_auto(source: &str) -> Result<Universe, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_universe_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_universe(Path::new(source))
    }
}

/// The one `.json` file directly inside `dir`.
fn single_candidate(dir: &Path) -> Result<PathBuf, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::ReadError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(LoadError::NoUniverse {
            path: dir.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(LoadError::AmbiguousUniverse {
            path: dir.to_path_buf(),
            candidates,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeName;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const UNIVERSE: &str = r#"{"types": [{"name": "Config", "fields": [{"name": "Name", "type": "string"}]}]}"#;

    #[test]
    fn load_universe_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", UNIVERSE).unwrap();

        let universe = load_universe(file.path()).unwrap();
        assert!(universe.is_struct(&TypeName::new("Config")));
    }

    #[test]
    fn load_universe_file_not_found() {
        let result = load_universe(Path::new("/nonexistent/universe.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_universe_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_universe(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_universe_directory_single_candidate() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("universe.json"), UNIVERSE).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a universe").unwrap();

        let universe = load_universe(dir.path()).unwrap();
        assert_eq!(universe.len(), 1);
    }

    #[test]
    fn load_universe_directory_empty() {
        let dir = TempDir::new().unwrap();
        let result = load_universe(dir.path());
        assert!(matches!(result, Err(LoadError::NoUniverse { .. })));
    }

    #[test]
    fn load_universe_directory_ambiguous() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), UNIVERSE).unwrap();
        std::fs::write(dir.path().join("b.json"), UNIVERSE).unwrap();

        match load_universe(dir.path()) {
            Err(LoadError::AmbiguousUniverse { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].ends_with("a.json"));
            }
            other => panic!("expected ambiguous universe, got {other:?}"),
        }
    }

    #[test]
    fn load_universe_str_invalid() {
        let result = load_universe_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/universe.json"));
        assert!(is_url("http://example.com/universe.json"));
        assert!(!is_url("/path/to/universe.json"));
        assert!(!is_url("universe.json"));
    }

    #[test]
    fn load_universe_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", UNIVERSE).unwrap();

        let universe = load_universe_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(universe.len(), 1);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_universe_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/universe.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(UNIVERSE)
                .create();

            let universe = load_universe_url(&format!("{}/universe.json", server.url())).unwrap();
            assert!(universe.is_struct(&TypeName::new("Config")));
            mock.assert();
        }

        #[test]
        fn load_universe_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_universe_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }

        #[test]
        fn load_universe_url_invalid_document() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/universe.json")
                .with_status(200)
                .with_body(r#"{"types": 3}"#)
                .create();

            let result = load_universe_url(&format!("{}/universe.json", server.url()));
            assert!(matches!(result, Err(LoadError::InvalidDocument { .. })));
        }

        #[test]
        fn load_universe_auto_url() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/universe.json")
                .with_status(200)
                .with_body(UNIVERSE)
                .create();

            let result = load_universe_auto(&format!("{}/universe.json", server.url()));
            assert!(result.is_ok());
        }
    }
}
