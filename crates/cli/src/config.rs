//! Default file locations for the CLI

use std::path::{Path, PathBuf};

/// Threshold file used when `-c` is not given
pub const DEFAULT_INPUT_FILE: &str = "item.csv";

/// Env file always applied before `-e`
pub const DEFAULT_ENV_FILE: &str = "default.env";

/// Path of `file_name` in the directory holding the running executable
pub fn beside_executable(file_name: &str) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join(file_name)
}

/// Input path from `-c`, or `item.csv` next to the executable
pub fn input_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| beside_executable(DEFAULT_INPUT_FILE))
}

pub fn default_env_path() -> PathBuf {
    beside_executable(DEFAULT_ENV_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sit_next_to_executable() {
        let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
        assert_eq!(input_path(None), exe_dir.join("item.csv"));
        assert_eq!(default_env_path(), exe_dir.join("default.env"));
    }

    #[test]
    fn test_explicit_input_wins() {
        let path = PathBuf::from("/tmp/vms.csv");
        assert_eq!(input_path(Some(path.clone())), path);
    }
}
