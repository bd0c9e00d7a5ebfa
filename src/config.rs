//! Runtime configuration, read from the environment (and `.env`).

use std::path::PathBuf;

const DEFAULT_LOG_FILTER: &str = "eventorias=debug,eventorias_lib=debug,info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Signed-in user at startup, if any.
    pub user_id: Option<String>,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                eprintln!("failed to load .env: {e}");
            }
        }

        Self {
            data_dir: data_dir_from(non_empty_var("EVENTORIAS_DATA_DIR"), non_empty_var("HOME")),
            user_id: non_empty_var("EVENTORIAS_USER_ID"),
            log_filter: non_empty_var("EVENTORIAS_LOG")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("eventorias.db")
    }

    /// Create the data directory and return the database path.
    pub fn prepare_db_path(&self) -> Result<PathBuf, String> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            format!(
                "failed to create data directory {}: {e}",
                self.data_dir.display()
            )
        })?;
        Ok(self.db_path())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn data_dir_from(explicit: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    if let Some(home) = home {
        return PathBuf::from(home).join(".eventorias");
    }
    PathBuf::from(".eventorias")
}
