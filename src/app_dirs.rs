use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/gincana`, falling back to the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("gincana"),
            )
        } else {
            ProjectDirs::from("", "", "gincana").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", "gincana") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("gincana_config.json")
        }
    }

    pub fn results_csv_path() -> PathBuf {
        Self::in_state_dir("results.csv")
    }

    pub fn results_db_path() -> PathBuf {
        Self::in_state_dir("results.db")
    }

    pub fn log_path() -> PathBuf {
        Self::in_state_dir("gincana.log")
    }

    fn in_state_dir(file_name: &str) -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join(file_name))
            .unwrap_or_else(|| PathBuf::from(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_have_expected_file_names() {
        assert!(AppDirs::results_csv_path().ends_with("results.csv"));
        assert!(AppDirs::results_db_path().ends_with("results.db"));
        assert!(AppDirs::log_path().ends_with("gincana.log"));
        assert!(AppDirs::config_path().ends_with("config.json"));
    }
}
