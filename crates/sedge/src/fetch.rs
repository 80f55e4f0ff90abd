//! Reading included documents
//!
//! Only three kinds of sources are accepted: `https://` URLs, `file://` URLs and plain paths
//! (`~` expands to the home directory). Every other URL scheme is refused before any I/O happens.
use crate::error::{FetchError, SecurityIssue};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Https(Url),
    File(PathBuf),
    Path(PathBuf),
}

impl Source {
    /// Check a locator against the allowed schemes
    pub fn classify(locator: &str) -> Result<Self, SecurityIssue> {
        let url = match Url::parse(locator) {
            Ok(url) => url,
            // no scheme at all
            Err(_) => return Ok(Source::Path(expand_home(locator))),
        };

        match url.scheme() {
            "https" => Ok(Source::Https(url)),
            "file" => match url.to_file_path() {
                Ok(path) => Ok(Source::File(path)),
                Err(()) => Err(SecurityIssue::DisallowedScheme("file".to_string())),
            },
            other => Err(SecurityIssue::DisallowedScheme(other.to_string())),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Https(url) => write!(f, "{url}"),
            Source::File(path) | Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

fn expand_home(locator: &str) -> PathBuf {
    let rest = match locator.strip_prefix('~') {
        Some("") => Some(""),
        Some(rest) => rest.strip_prefix('/'),
        None => None,
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(locator),
    }
}

/// Reads the text behind a classified [Source]
pub trait Fetcher {
    fn fetch(&self, source: &Source) -> Result<String, FetchError>;
}

/// Reads local files and fetches `https://` URLs
#[derive(Debug)]
pub struct ContentFetcher {
    client: reqwest::blocking::Client,
}

impl ContentFetcher {
    pub fn new(verify_tls: bool) -> Result<Self, FetchError> {
        if !verify_tls {
            tracing::warn!("TLS certificate verification is disabled for https includes");
        }

        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self { client })
    }

    fn read(path: &Path) -> Result<String, FetchError> {
        tracing::info!(path=%path.display(), "reading include");
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Fetcher for ContentFetcher {
    fn fetch(&self, source: &Source) -> Result<String, FetchError> {
        match source {
            Source::Https(url) => {
                tracing::info!(%url, "fetching include");
                let response = self.client.get(url.clone()).send()?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Refused {
                        status: status.as_u16(),
                    });
                }

                Ok(response.text()?)
            }
            Source::File(path) | Source::Path(path) => Self::read(path),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn https_is_allowed() {
        let source = Source::classify("https://example.com/hosts.sedge").unwrap();
        assert!(matches!(source, Source::Https(url) if url.host_str() == Some("example.com")));
    }

    #[test]
    fn file_urls_are_decoded() {
        let source = Source::classify("file:///tmp/my%20hosts.sedge").unwrap();
        assert_eq!(source, Source::File(PathBuf::from("/tmp/my hosts.sedge")));
    }

    #[test]
    fn plain_paths() {
        assert_eq!(
            Source::classify("/etc/sedge/base.sedge").unwrap(),
            Source::Path(PathBuf::from("/etc/sedge/base.sedge"))
        );
        assert_eq!(
            Source::classify("relative/base.sedge").unwrap(),
            Source::Path(PathBuf::from("relative/base.sedge"))
        );
    }

    #[test]
    fn home_directory_expansion() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            Source::classify("~/.sedge/base.sedge").unwrap(),
            Source::Path(home.join(".sedge/base.sedge"))
        );
        assert_eq!(
            Source::classify("~otheruser/x").unwrap(),
            Source::Path(PathBuf::from("~otheruser/x"))
        );
    }

    #[test]
    fn other_schemes_are_refused() {
        for locator in [
            "http://example.com/thing.sedge",
            "ftp://example.com/thing.sedge",
            "ssh:host",
        ] {
            assert!(
                matches!(
                    Source::classify(locator),
                    Err(SecurityIssue::DisallowedScheme(_))
                ),
                "{locator}"
            );
        }
    }
}
