//! Configuration.
//!
//! The checker is configured from a TOML file; every key is optional.
//!
//! ```toml
//! store_name = "dutch-checker"
//! history_key = "history"
//! storage_dir = "/var/lib/dutch-checker"   # omit for in-memory state
//! questions = ["Wat heb je gisteren gedaan?"]
//!
//! [translation]
//! source = "nl"
//! target = "en"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{CheckerError, ConfigError};
use crate::store::{FileStorage, MemoryStorage, Storage, Store};
use crate::workflow::{LanguageServices, QuestionPool, TranslationPair, Workflow};

/// Settings for building the checker store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Name of the store; its snapshot lives under `store:<name>`.
    pub store_name: String,
    /// Storage key of the persisted history.
    pub history_key: String,
    /// Directory for persisted state. In-memory when absent.
    pub storage_dir: Option<PathBuf>,
    /// Language pair for translations.
    pub translation: TranslationPair,
    /// Practice questions. The built-in pool is used when empty.
    pub questions: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            store_name: "dutch-checker".to_string(),
            history_key: "history".to_string(),
            storage_dir: None,
            translation: TranslationPair::default(),
            questions: Vec::new(),
        }
    }
}

impl CheckerConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The configured question pool.
    pub fn question_pool(&self) -> QuestionPool {
        if self.questions.is_empty() {
            QuestionPool::default()
        } else {
            QuestionPool::new(self.questions.iter().cloned())
        }
    }

    /// Open the configured storage.
    pub fn storage(&self) -> Result<Arc<dyn Storage>, CheckerError> {
        let storage: Arc<dyn Storage> = match &self.storage_dir {
            Some(dir) => Arc::new(FileStorage::open(dir)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }

    /// Build the checker store. Call once at startup and share the result
    /// with every consumer.
    pub fn build_store(
        &self,
        services: Arc<dyn LanguageServices>,
    ) -> Result<Store<Workflow>, CheckerError> {
        let storage = self.storage()?;
        let builder = Workflow::builder(services)
            .questions(self.question_pool())
            .translation(self.translation.clone())
            .history_storage(storage.clone(), self.history_key.clone());

        tracing::info!(
            store = %self.store_name,
            persistent = self.storage_dir.is_some(),
            "building checker store"
        );
        Ok(Workflow::store(self.store_name.clone(), storage, builder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CheckerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CheckerConfig::default());
        assert_eq!(config.translation.source, "nl");
        assert_eq!(config.translation.target, "en");
        assert_eq!(config.question_pool(), QuestionPool::default());
    }

    #[test]
    fn parses_every_key() {
        let config = CheckerConfig::from_toml_str(
            r#"
            store_name = "oefenen"
            history_key = "gesprek"
            storage_dir = "/tmp/oefenen"
            questions = ["Hoe heet je?", "Waar woon je?"]

            [translation]
            source = "nl"
            target = "de"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_name, "oefenen");
        assert_eq!(config.history_key, "gesprek");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/oefenen")));
        assert_eq!(config.translation.target, "de");
        assert_eq!(config.question_pool().len(), 2);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let err = CheckerConfig::from_toml_str("questions = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckerConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
