use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE: &str = "kantanmemo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub session_file: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".into(),
            session_file: default_session_file(),
            log_filter: "warn".into(),
        }
    }
}

/// Defaults, then `kantanmemo.toml` (or `config_path`), then environment.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(CONFIG_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("backend_url") {
        settings.backend_url = v.clone();
    }
    if let Some(v) = file_cfg.get("session_file") {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("KANTANMEMO_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = non_empty("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = non_empty("KANTANMEMO_SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }
    if let Some(v) = non_empty("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    if let Some(v) = non_empty("KANTANMEMO_LOG") {
        settings.log_filter = v;
    }
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|base| base.join("kantanmemo"))
        .unwrap_or_else(|| PathBuf::from(".kantanmemo"))
        .join("session.json")
}
