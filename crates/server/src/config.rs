use std::fs;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub top_k: usize,
    pub score_floor: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8443".into(),
            database_url: "sqlite://./data/gallery.db".into(),
            top_k: 3,
            score_floor: 0.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    top_k: Option<usize>,
    score_floor: Option<f32>,
}

/// Defaults, overlaid by `lookalike.toml` if present, overlaid by env vars.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("lookalike.toml") {
        if let Ok(file_cfg) = toml::from_str::<FileSettings>(&raw) {
            if let Some(v) = file_cfg.bind_addr {
                settings.server_bind = v;
            }
            if let Some(v) = file_cfg.database_url {
                settings.database_url = v;
            }
            if let Some(v) = file_cfg.top_k {
                settings.top_k = v;
            }
            if let Some(v) = file_cfg.score_floor {
                settings.score_floor = v;
            }
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("APP__TOP_K") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.top_k = parsed;
        }
    }

    if let Ok(v) = std::env::var("APP__SCORE_FLOOR") {
        if let Ok(parsed) = v.parse::<f32>() {
            settings.score_floor = parsed;
        }
    }

    settings
}

/// Accept plain file paths where a SQLite URL is expected.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
