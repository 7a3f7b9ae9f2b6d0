use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::unit::CallableDescriptor;

/// Operator-supplied type directives: callable name (qualified or bare)
/// to one directive per positional parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, Vec<String>>,
}

impl Manifest {
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn insert(&mut self, name: &str, directives: &[&str]) {
        self.entries.insert(
            name.to_string(),
            directives.iter().map(|d| d.to_string()).collect(),
        );
    }

    /// A copy of `self` with `other`'s entries layered on top.
    pub fn merged(&self, other: &Manifest) -> Manifest {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.clone());
        Manifest { entries }
    }

    /// Entry for a callable: qualified name first, then bare name.
    pub fn lookup(&self, descriptor: &CallableDescriptor) -> Option<(&str, &[String])> {
        [descriptor.qualified(), descriptor.name.as_str()]
            .into_iter()
            .find_map(|key| {
                self.entries
                    .get_key_value(key)
                    .map(|(k, v)| (k.as_str(), v.as_slice()))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
