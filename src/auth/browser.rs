use crate::error::{Result, SsoError};

/// Opens the device verification page for the user
#[cfg_attr(test, mockall::automock)]
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        webbrowser::open(url).map_err(|e| SsoError::BrowserLaunchFailed(e.to_string()))
    }
}
