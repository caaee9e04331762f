//! Static user → projects source mapping.
//!
//! The file is a single JSON object keyed by user name, each value a list of
//! project names:
//!
//! ```json
//! { "alice": ["web", "billing"], "bob": ["web"] }
//! ```
//!
//! Entries keep their order in the file. A user name appearing twice merges
//! into the first occurrence. Only JSON is accepted; YAML-only syntax is
//! malformed.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mapping: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One user and the project names listed for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub user: String,
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMapping {
    entries: Vec<SourceEntry>,
    /// User name → position in `entries`.
    positions: HashMap<String, usize>,
}

impl SourceMapping {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, user: String, projects: Vec<String>) {
        match self.positions.get(&user) {
            Some(&at) => self.entries[at].projects.extend(projects),
            None => {
                self.positions.insert(user.clone(), self.entries.len());
                self.entries.push(SourceEntry { user, projects });
            }
        }
    }
}

impl<U, P, I> FromIterator<(U, I)> for SourceMapping
where
    U: Into<String>,
    P: Into<String>,
    I: IntoIterator<Item = P>,
{
    fn from_iter<T: IntoIterator<Item = (U, I)>>(iter: T) -> Self {
        let mut mapping = Self::default();
        for (user, projects) in iter {
            mapping.push(user.into(), projects.into_iter().map(Into::into).collect());
        }
        mapping
    }
}

impl<'de> Deserialize<'de> for SourceMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = SourceMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping user names to lists of project names")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut mapping = SourceMapping::default();
                while let Some((user, projects)) = access.next_entry::<String, Vec<String>>()? {
                    mapping.push(user, projects);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn keeps_file_order() {
        let m = SourceMapping::from_json_str(
            r#"{ "zed": ["a"], "alice": ["b", "c"], "mike": [] }"#,
        )
        .unwrap();

        let users: Vec<&str> = m.entries().iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["zed", "alice", "mike"]);
        assert_eq!(m.entries()[1].projects, vec!["b".to_string(), "c".to_string()]);
        assert!(m.entries()[2].projects.is_empty());
    }

    #[test]
    fn duplicate_users_merge() {
        let m = SourceMapping::from_json_str(r#"{ "alice": ["a"], "bob": ["x"], "alice": ["b"] }"#)
            .unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.entries()[0].projects, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn large_mapping_decodes_with_merges_in_place() {
        let users = 50_000;
        let mut raw = String::from("{");
        for i in 0..users {
            raw.push_str(&format!(r#""user{i}": ["p{i}"], "#));
        }
        raw.push_str(r#""user0": ["extra"], "user49999": ["extra"] }"#);

        let started = std::time::Instant::now();
        let m = SourceMapping::from_json_str(&raw).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert_eq!(m.len(), users);
        assert_eq!(m.entries()[0].projects, vec!["p0".to_string(), "extra".to_string()]);
        assert_eq!(m.entries()[users - 1].user, "user49999");
        assert_eq!(m.entries()[users - 1].projects.len(), 2);
    }

    #[test]
    fn non_list_value_is_malformed() {
        let err = SourceMapping::from_json_str(r#"{ "alice": "web" }"#).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn yaml_syntax_is_rejected() {
        let err = SourceMapping::from_json_str("# users\nalice: [web]\nbob:\n  - web\n").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn top_level_array_is_malformed() {
        let err = SourceMapping::from_json_str(r#"[["alice", ["web"]]]"#).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bob": ["alpha"] }}"#).unwrap();

        let m = SourceMapping::from_path(file.path()).unwrap();
        assert_eq!(
            m.entries(),
            &[SourceEntry {
                user: "bob".to_string(),
                projects: vec!["alpha".to_string()],
            }]
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SourceMapping::from_path("/nonexistent/map.json").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn builds_from_iterator() {
        let m: SourceMapping = [("alice", vec!["p1", "p2"]), ("bob", vec![])]
            .into_iter()
            .collect();
        assert_eq!(m.len(), 2);
        assert!(!m.is_empty());
    }
}
