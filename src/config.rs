use crate::app_dirs::AppDirs;
use crate::error::{GincanaError, Result};
use crate::passages::{Passage, PassageSet, DEFAULT_SET};
use crate::session::{SessionConfig, DEFAULT_COUNTDOWN_SECS};
use crate::store::StoreKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub typing_secs: u64,
    pub countdown_secs: Option<u64>,
    pub reading: bool,
    pub comprehension: bool,
    pub passage_set: String,
    /// Always use this passage of the set instead of a random one
    pub passage_title: Option<String>,
    pub reference_text: Option<String>,
    pub store: StoreKind,
    pub results_path: Option<PathBuf>,
    pub auto_save: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            typing_secs: 60,
            countdown_secs: Some(DEFAULT_COUNTDOWN_SECS),
            reading: false,
            comprehension: false,
            passage_set: DEFAULT_SET.to_string(),
            passage_title: None,
            reference_text: None,
            store: StoreKind::Csv,
            results_path: None,
            auto_save: true,
        }
    }
}

impl Config {
    /// Fixed reference text if one is configured, then the named passage,
    /// otherwise a random passage from the configured set
    pub fn passage(&self) -> Result<Passage> {
        if let Some(ref text) = self.reference_text {
            return Ok(Passage::from_text(text.clone()));
        }

        let set = PassageSet::load(&self.passage_set)?;
        match self.passage_title {
            Some(ref title) => set.find(title).cloned().ok_or_else(|| {
                GincanaError::ConfigurationUnavailable(format!(
                    "no passage titled '{title}' in set '{}'",
                    self.passage_set
                ))
            }),
            None => set.pick_random().cloned(),
        }
    }

    pub fn session_config(&self, passage: &Passage) -> Result<SessionConfig> {
        let quiz = if self.comprehension {
            let quiz = passage.quiz.clone().ok_or_else(|| {
                GincanaError::ConfigurationUnavailable(format!(
                    "passage '{}' has no comprehension questions",
                    passage.title
                ))
            })?;
            Some(quiz)
        } else {
            None
        };

        let config = SessionConfig {
            reference_text: passage.text.clone(),
            typing_duration: Duration::from_secs(self.typing_secs),
            countdown: self
                .countdown_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            reading: self.reading,
            quiz,
        };
        config.validate()?;
        Ok(config)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comprehension::{Question, Quiz};
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            typing_secs: 90,
            countdown_secs: None,
            reading: true,
            comprehension: true,
            passage_set: "lectura".into(),
            passage_title: Some("Primer contacto".into()),
            reference_text: Some("hola mundo".into()),
            store: StoreKind::Sqlite,
            results_path: Some(PathBuf::from("/tmp/gincana.db")),
            auto_save: false,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_or_malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "typing_secs": 30, "store": "sqlite" }"#).unwrap();

        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.typing_secs, 30);
        assert_eq!(cfg.store, StoreKind::Sqlite);
        assert_eq!(cfg.passage_set, DEFAULT_SET);
        assert!(cfg.auto_save);
    }

    #[test]
    fn fixed_reference_text_wins() {
        let cfg = Config {
            reference_text: Some("texto fijo".into()),
            ..Config::default()
        };
        assert_eq!(cfg.passage().unwrap().text, "texto fijo");
    }

    #[test]
    fn unknown_passage_set_is_configuration_error() {
        let cfg = Config {
            passage_set: "nope".into(),
            ..Config::default()
        };
        assert_matches!(
            cfg.passage(),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }

    #[test]
    fn named_passage_is_picked_every_time() {
        let cfg = Config {
            passage_title: Some("SALUDO".into()),
            ..Config::default()
        };
        for _ in 0..5 {
            assert_eq!(cfg.passage().unwrap().text, "hola mundo");
        }
    }

    #[test]
    fn unknown_passage_title_is_configuration_error() {
        let cfg = Config {
            passage_title: Some("no existe".into()),
            ..Config::default()
        };
        assert_matches!(
            cfg.passage(),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }

    #[test]
    fn session_config_from_defaults() {
        let cfg = Config::default();
        let session = cfg
            .session_config(&Passage::from_text("hola mundo"))
            .unwrap();

        assert_eq!(session.reference_text, "hola mundo");
        assert_eq!(session.typing_duration, Duration::from_secs(60));
        assert_eq!(session.countdown, Some(Duration::from_secs(5)));
        assert!(!session.reading);
        assert!(session.quiz.is_none());
    }

    #[test]
    fn zero_countdown_disables_it() {
        let cfg = Config {
            countdown_secs: Some(0),
            ..Config::default()
        };
        let session = cfg.session_config(&Passage::from_text("hola")).unwrap();
        assert_eq!(session.countdown, None);
    }

    #[test]
    fn comprehension_requires_a_quiz() {
        let cfg = Config {
            comprehension: true,
            ..Config::default()
        };
        assert_matches!(
            cfg.session_config(&Passage::from_text("hola")),
            Err(GincanaError::ConfigurationUnavailable(_))
        );

        let passage = Passage {
            title: "con preguntas".into(),
            text: "hola mundo".into(),
            quiz: Some(Quiz::new(vec![Question {
                prompt: "¿Qué?".into(),
                options: vec!["hola".into(), "adios".into()],
                correct: 0,
            }])),
        };
        let session = cfg.session_config(&passage).unwrap();
        assert_eq!(session.quiz.unwrap().len(), 1);
    }

    #[test]
    fn zero_typing_secs_is_rejected() {
        let cfg = Config {
            typing_secs: 0,
            ..Config::default()
        };
        assert_matches!(
            cfg.session_config(&Passage::from_text("hola")),
            Err(GincanaError::ConfigurationUnavailable(_))
        );
    }
}
