//! Exclusion policy: pure lookups against the configured deny-lists.

use std::collections::HashSet;

use crate::config::ExclusionConfig;

/// Any filename containing this is skipped, whatever the configuration says.
const ALWAYS_EXCLUDED_FRAGMENT: &str = "LICENSE";

#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    repositories: HashSet<String>,
    filenames: HashSet<String>,
    /// Lower-cased, leading dot included.
    extensions: HashSet<String>,
}

impl FilterPolicy {
    pub fn new(config: &ExclusionConfig) -> Self {
        Self {
            repositories: config.repos.iter().cloned().collect(),
            filenames: config.files.iter().cloned().collect(),
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn excludes_repository(&self, name: &str) -> bool {
        self.repositories.contains(name)
    }

    /// Exact match against the list, plus the `LICENSE` substring rule.
    pub fn excludes_filename(&self, name: &str) -> bool {
        name.contains(ALWAYS_EXCLUDED_FRAGMENT) || self.filenames.contains(name)
    }

    /// `ext` is expected with its leading dot; comparison ignores case.
    pub fn excludes_extension(&self, ext: &str) -> bool {
        self.extensions.contains(&ext.to_lowercase())
    }

    /// Filename first, then extension. True means the file must not be fetched.
    pub fn excludes_file(&self, name: &str) -> bool {
        self.excludes_filename(name) || self.excludes_extension(&extension_of(name))
    }
}

/// Everything from the last dot of the last path component, lower-cased; empty when there is
/// no dot. Dotfiles count as all extension (`.gitignore`).
pub fn extension_of(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.rfind('.')
        .map(|dot| base[dot..].to_lowercase())
        .unwrap_or_default()
}
