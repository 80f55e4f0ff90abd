//! SSH key library
//!
//! `@key` definitions name keys by fingerprint. [ScannedKeyLibrary] finds the matching private key
//! files by running `ssh-keygen -l` over every candidate file of a directory.
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Resolves a key fingerprint to the file holding the key
pub trait KeyLibrary {
    fn lookup(&self, fingerprint: &str) -> Option<PathBuf>;
}

/// Files in a key directory that are never keys
const SKIPPED_FILES: &[&str] = &["config", "known_hosts", "known_hosts.old", "authorized_keys"];

#[derive(Debug, Default)]
pub struct ScannedKeyLibrary {
    root: PathBuf,
    keys_by_fingerprint: IndexMap<String, PathBuf>,
}

impl ScannedKeyLibrary {
    /// Index every private key below `root`
    ///
    /// A missing directory gives an empty library.
    pub fn scan(root: impl Into<PathBuf>) -> Self {
        let mut library = Self {
            root: root.into(),
            keys_by_fingerprint: Default::default(),
        };

        let candidates: Vec<PathBuf> = walkdir::WalkDir::new(&library.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!(%err, "skipping unreadable key directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                !name.starts_with('.')
                    && !name.ends_with(".pub")
                    && !SKIPPED_FILES.contains(&&*name)
            })
            .map(walkdir::DirEntry::into_path)
            .collect();

        for path in candidates {
            if let Some(fingerprint) = scan_key(&path, true) {
                library.insert(fingerprint, path);
            }
        }

        library
    }

    fn insert(&mut self, fingerprint: String, path: PathBuf) {
        if let Some(existing) = self.keys_by_fingerprint.get(&fingerprint) {
            tracing::warn!(
                key=%self.relative(&path).display(),
                other=%self.relative(existing).display(),
                "key has the same fingerprint as another key, ignoring duplicate key"
            );
            return;
        }

        tracing::debug!(key=%self.relative(&path).display(), %fingerprint, "scanned key");
        self.keys_by_fingerprint.insert(fingerprint, path);
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// `(fingerprint, path)` sorted by path
    pub fn keys(&self) -> Vec<(&str, &Path)> {
        let mut keys: Vec<_> = self
            .keys_by_fingerprint
            .iter()
            .map(|(fingerprint, path)| (fingerprint.as_str(), path.as_path()))
            .collect();
        keys.sort_by(|a, b| a.1.cmp(b.1));
        keys
    }

    /// Unique key files, sorted
    pub fn key_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self
            .keys_by_fingerprint
            .values()
            .map(PathBuf::as_path)
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn is_empty(&self) -> bool {
        self.keys_by_fingerprint.is_empty()
    }
}

impl<F: Into<String>, P: Into<PathBuf>> FromIterator<(F, P)> for ScannedKeyLibrary {
    fn from_iter<T: IntoIterator<Item = (F, P)>>(iter: T) -> Self {
        let mut library = Self::default();
        for (fingerprint, path) in iter {
            library.insert(fingerprint.into(), path.into());
        }
        library
    }
}

impl KeyLibrary for ScannedKeyLibrary {
    fn lookup(&self, fingerprint: &str) -> Option<PathBuf> {
        self.keys_by_fingerprint.get(fingerprint).cloned()
    }
}

/// Fingerprint of a key file, generating a missing public key once if needed
fn scan_key(path: &Path, may_generate: bool) -> Option<String> {
    let output = Command::new("ssh-keygen").arg("-l").arg("-f").arg(path).output();

    match output {
        Ok(output) if output.status.success() => {
            let info = String::from_utf8_lossy(&output.stdout);
            let fingerprint = fingerprint_from_keyinfo(&info);
            if fingerprint.is_none() {
                tracing::warn!(key=%path.display(), output=%info.trim(), "public key fingerprint couldn't be parsed");
            }
            fingerprint
        }
        Ok(_) if may_generate && generate_public_key(path) => scan_key(path, false),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(%err, "unable to run ssh-keygen");
            None
        }
    }
}

/// Write `<key>.pub` next to a private key that lacks one
fn generate_public_key(path: &Path) -> bool {
    let mut public = path.as_os_str().to_owned();
    public.push(".pub");
    let public = PathBuf::from(public);

    if public.exists() {
        return false;
    }

    tracing::warn!(key=%path.display(), "public key does not exist for private key, attempting to generate; you may be prompted for a pass phrase");

    let output = match Command::new("ssh-keygen")
        .arg("-y")
        .arg("-f")
        .arg(path)
        .stderr(std::process::Stdio::inherit())
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return false,
    };

    match std::fs::write(&public, output.stdout) {
        Ok(()) => {
            tracing::info!(key=%public.display(), "generated public key");
            true
        }
        Err(err) => {
            tracing::warn!(key=%public.display(), %err, "unable to write public key");
            false
        }
    }
}

/// Extract the fingerprint from `ssh-keygen -l` output
///
/// The output is `<bits> <fingerprint> <comment> (<type>)`.
pub fn fingerprint_from_keyinfo(output: &str) -> Option<String> {
    let parts: Vec<&str> = output.split_whitespace().collect();
    match parts.as_slice() {
        [_, fingerprint, _, _] => Some(fingerprint.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fingerprint_parser() {
        assert_eq!(
            fingerprint_from_keyinfo(
                "2048 aa:cb:d2:e2:00:6f:21:b4:fe:39:92:ed:eb:5e:4d:38 grahame@anglachel (RSA)"
            )
            .as_deref(),
            Some("aa:cb:d2:e2:00:6f:21:b4:fe:39:92:ed:eb:5e:4d:38")
        );
    }

    #[test]
    fn fingerprint_parser_double_space() {
        assert_eq!(
            fingerprint_from_keyinfo(
                "2048 aa:cb:d2:e2:00:6f:21:b4:fe:39:92:ed:eb:5e:4d:38  grahame@anglachel (RSA)\n"
            )
            .as_deref(),
            Some("aa:cb:d2:e2:00:6f:21:b4:fe:39:92:ed:eb:5e:4d:38")
        );
    }

    #[test]
    fn fingerprint_parser_rejects_other_output() {
        assert_eq!(fingerprint_from_keyinfo("is not a key file."), None);
    }

    #[test]
    fn first_key_with_a_fingerprint_wins() {
        let library: ScannedKeyLibrary = [
            ("SHA256:abc", "/keys/a"),
            ("SHA256:def", "/keys/b"),
            ("SHA256:abc", "/keys/c"),
        ]
        .into_iter()
        .collect();

        assert_eq!(library.lookup("SHA256:abc"), Some(PathBuf::from("/keys/a")));
        assert_eq!(library.lookup("SHA256:xyz"), None);
        assert_eq!(
            library.key_files(),
            [Path::new("/keys/a"), Path::new("/keys/b")]
        );
    }

    #[test]
    fn missing_directory_is_empty() {
        let library = ScannedKeyLibrary::scan("/does-not-exist");
        assert!(library.is_empty());
    }
}
