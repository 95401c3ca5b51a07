// Environment detection, computed once at startup and passed down explicitly

use crate::error::{Result, SsoError};
use std::path::{Path, PathBuf};
use std::process::Command;

const WINHOME_VAR: &str = "SSOSYNC_USE_WINHOME_IN_WSL";

/// Every filesystem location and platform fact the rest of the crate needs
#[derive(Debug, Clone)]
pub struct Environment {
    pub aws_dir: PathBuf,
    pub profiles_file: PathBuf,
    pub credentials_file: PathBuf,
    pub session_cache_dir: PathBuf,
    pub settings_dir: PathBuf,
    pub headless: bool,
}

impl Environment {
    /// Inspect the process environment
    pub fn detect(force_headless: bool) -> Result<Self> {
        let home_dir = match windows_home_in_wsl()? {
            Some(home) => home,
            None => dirs::home_dir().ok_or_else(|| {
                SsoError::ConfigError("Could not determine home directory".to_string())
            })?,
        };

        let cache_root = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let mut env = Self::with_home(&home_dir, &cache_root.join("ssosync"));

        if let Some(path) = non_empty_var("AWS_CONFIG_FILE") {
            env.profiles_file = PathBuf::from(path);
        }
        if let Some(path) = non_empty_var("AWS_SHARED_CREDENTIALS_FILE") {
            env.credentials_file = PathBuf::from(path);
        }
        if let Some(xdg_config) = non_empty_var("XDG_CONFIG_HOME") {
            env.settings_dir = PathBuf::from(xdg_config).join("ssosync");
        }
        env.headless = force_headless || is_headless_environment();

        tracing::debug!(?env, "environment detected");
        Ok(env)
    }

    /// Default layout beneath a given home directory
    pub fn with_home(home_dir: &Path, session_cache_dir: &Path) -> Self {
        let aws_dir = home_dir.join(".aws");
        let xdg_config = home_dir.join(".config");
        let settings_dir = if xdg_config.exists() {
            xdg_config.join("ssosync")
        } else {
            home_dir.join(".ssosync")
        };

        Self {
            profiles_file: aws_dir.join("config"),
            credentials_file: aws_dir.join("credentials"),
            aws_dir,
            session_cache_dir: session_cache_dir.to_path_buf(),
            settings_dir,
            headless: false,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// When opted in on WSL2, use the Windows user profile as the home directory
/// so that Windows and Linux tooling share one set of AWS files
fn windows_home_in_wsl() -> Result<Option<PathBuf>> {
    if non_empty_var(WINHOME_VAR).as_deref() != Some("true") || !is_wsl2() {
        return Ok(None);
    }

    let windows_home = run_capture("wslvar", &["USERPROFILE"])?;
    let home = run_capture("wslpath", &[windows_home.as_str()])?;
    tracing::debug!("Using Windows home directory from WSL: {}", home);
    Ok(Some(PathBuf::from(home)))
}

fn is_wsl2() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.to_lowercase().contains("microsoft-standard-wsl2"))
        .unwrap_or(false)
}

fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(SsoError::ConfigError(format!(
            "{} exited with {}",
            program, output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check if we're running in a headless environment
///
/// Headless mode is detected when:
/// - SSH_TTY or SSH_CONNECTION environment variables are set (SSH session)
/// - TERM is set to "dumb" or is empty
/// - On Linux: DISPLAY environment variable is not set (no X11)
/// - CI environment is detected
///
/// Note: macOS doesn't use DISPLAY, so we don't check it on Darwin
fn is_headless_environment() -> bool {
    if std::env::var("SSH_TTY").is_ok() {
        tracing::debug!("Headless detected: SSH_TTY set");
        return true;
    }

    if std::env::var("SSH_CONNECTION").is_ok() {
        tracing::debug!("Headless detected: SSH_CONNECTION set");
        return true;
    }

    if std::env::var("CI").is_ok() {
        tracing::debug!("Headless detected: CI environment");
        return true;
    }

    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" || term.is_empty() {
            tracing::debug!("Headless detected: TERM is '{}'", term);
            return true;
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err() {
            tracing::debug!("Headless detected: no DISPLAY or WAYLAND_DISPLAY");
            return true;
        }
    }

    false
}
