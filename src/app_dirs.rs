use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "rollcall")
    }

    pub fn settings_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("rollcall_settings.json"))
    }

    /// Log file location. The TUI owns stdout/stderr, so logs go to disk.
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("rollcall")
                .join("rollcall.log")
        } else {
            Self::project()
                .map(|pd| pd.data_local_dir().join("rollcall.log"))
                .unwrap_or_else(|| PathBuf::from("rollcall.log"))
        }
    }

    pub fn export_dir() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_dir().join("exports"))
            .unwrap_or_else(|| PathBuf::from("exports"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_named_for_the_app() {
        assert!(AppDirs::settings_path().ends_with("settings.json"));
        assert!(AppDirs::log_path().ends_with("rollcall.log"));
        assert!(AppDirs::export_dir().ends_with("exports"));
    }
}
