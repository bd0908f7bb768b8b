use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn payouts_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("wagewatch");
            Some(state_dir.join("payouts.json"))
        } else {
            ProjectDirs::from("", "", "wagewatch")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("payouts.json"))
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wagewatch")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }
}
