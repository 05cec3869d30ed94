//! Pre-provisioned identifiers that plans may fill in automatically.
//!
//! Only allow-listed keys are read, and only from a `.env` file, never from
//! the process environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Keys that may be loaded from `.env`
pub const ALLOWED_SECRET_KEYS: &[&str] = &["ASANA_WORKSPACE_ID", "ASANA_PROJECT_ID"];

/// Parameter names without an id suffix that still mean "the identifier of"
const BARE_ID_STEMS: &[&str] = &["workspace", "project"];

#[derive(Debug, Clone, Default)]
pub struct SecretsStore {
    values: BTreeMap<String, String>,
}

impl SecretsStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        SecretsStore {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Read allow-listed keys from one `.env` file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let iter = dotenv::from_path_iter(path)
            .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
            if ALLOWED_SECRET_KEYS.contains(&key.as_str()) && !value.trim().is_empty() {
                values.insert(key, value);
            }
        }
        log::info!(
            "[SECRETS] Loaded {} pre-provisioned identifiers from {}",
            values.len(),
            path.display()
        );
        Ok(SecretsStore { values })
    }

    /// Look for `.env` in the working directory and up to three parents.
    /// A missing file yields an empty store.
    pub fn discover() -> Self {
        match find_env_file() {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                log::warn!("[SECRETS] {}", e);
                Self::empty()
            }),
            None => {
                log::debug!("[SECRETS] No .env file found, no identifiers pre-provisioned");
                Self::empty()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_all(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn find_env_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    for _ in 0..4 {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn id_stem(name: &str) -> &str {
    name.strip_suffix("_gid")
        .or_else(|| name.strip_suffix("_id"))
        .unwrap_or(name)
}

fn has_id_suffix(name: &str) -> bool {
    name.ends_with("_id") || name.ends_with("_gid")
}

/// Whether identifier `key` (e.g. `ASANA_WORKSPACE_ID`, `asana_workspace_gid`)
/// can fill parameter `param` of a tool in `domain`.
///
/// Keys are `{domain}_{name}`. A key matches when its domain agrees with the
/// tool's and its name equals the parameter, or both name the same id stem
/// (`workspace_gid` ~ `workspace_id` ~ `workspace`).
pub fn identifier_matches(key: &str, domain: Option<&str>, param: &str) -> bool {
    let key = key.to_lowercase();
    let param = param.to_lowercase();
    if key == param {
        return true;
    }

    let Some((key_domain, key_name)) = key.split_once('_') else {
        return false;
    };
    if let Some(domain) = domain {
        if !key_domain.eq_ignore_ascii_case(domain) {
            return false;
        }
    }
    if key_name == param {
        return true;
    }

    let stem = id_stem(key_name);
    if stem == key_name {
        return false;
    }
    if has_id_suffix(&param) {
        return id_stem(&param) == stem;
    }
    param == stem && BARE_ID_STEMS.contains(&stem)
}

/// First identifier that can fill `param`, if any
pub fn resolve_identifier<'a>(
    identifiers: &'a BTreeMap<String, String>,
    domain: Option<&str>,
    param: &str,
) -> Option<&'a str> {
    identifiers
        .iter()
        .find(|(key, value)| !value.is_empty() && identifier_matches(key, domain, param))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_only_allow_listed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ASANA_WORKSPACE_ID=1208").unwrap();
        writeln!(file, "ASANA_PROJECT_ID=").unwrap();
        writeln!(file, "OPENAI_API_KEY=sk-should-not-load").unwrap();

        let store = SecretsStore::load_from_file(&path).unwrap();
        assert_eq!(store.get("ASANA_WORKSPACE_ID"), Some("1208"));
        assert_eq!(store.get("ASANA_PROJECT_ID"), None);
        assert_eq!(store.get("OPENAI_API_KEY"), None);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SecretsStore::load_from_file(&dir.path().join(".env")).is_err());
    }

    #[test]
    fn test_identifier_aliases() {
        let domain = Some("asana");
        assert!(identifier_matches("ASANA_WORKSPACE_ID", domain, "workspace"));
        assert!(identifier_matches("ASANA_WORKSPACE_ID", domain, "workspace_gid"));
        assert!(identifier_matches("ASANA_WORKSPACE_ID", domain, "workspace_id"));
        assert!(identifier_matches("asana_project_gid", domain, "project"));
        assert!(identifier_matches("ASANA_WORKSPACE_ID", domain, "ASANA_WORKSPACE_ID"));
        assert!(!identifier_matches("ASANA_WORKSPACE_ID", domain, "project"));
    }

    #[test]
    fn test_identifier_requires_matching_domain() {
        assert!(!identifier_matches("ASANA_WORKSPACE_ID", Some("github"), "workspace"));
        assert!(identifier_matches("ASANA_WORKSPACE_ID", None, "workspace"));
    }

    #[test]
    fn test_bare_repo_not_filled_from_repo_id() {
        assert!(!identifier_matches("github_repo_id", Some("github"), "repo"));
        assert!(identifier_matches("github_repo_id", Some("github"), "repo_id"));
    }

    #[test]
    fn test_resolve_identifier() {
        let store = SecretsStore::from_pairs([
            ("ASANA_PROJECT_ID", "77"),
            ("ASANA_WORKSPACE_ID", "12"),
        ]);
        assert_eq!(resolve_identifier(store.get_all(), Some("asana"), "workspace"), Some("12"));
        assert_eq!(resolve_identifier(store.get_all(), Some("asana"), "name"), None);
    }
}
