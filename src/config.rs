//! Provider configuration

use crate::api::hosts::ImageHosts;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Generic card back used when a card has no back-face artwork of its own
pub const DEFAULT_CARD_BACK_URL: &str =
    "https://s3.amazonaws.com/ccg-corporate-production/news-images/Back0_Sheet%20(F)20201203163456929.jpg";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const USER_AGENT: &str = "D2D-Automations-CardProvider/1.0";

/// Where the provider reads its tables from and how it talks to image hosts
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Card table (names, types, set metadata)
    pub cards_path: PathBuf,
    /// Identifier table (uuid -> image ids)
    pub identifiers_path: PathBuf,
    pub card_back_url: String,
    pub hosts: ImageHosts,
    /// Applied to every HTTP request so a stalled host cannot hang a caller
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let dir = default_data_dir();
        Self::new(dir.join("cards.csv"), dir.join("cardIdentifiers.csv"))
    }
}

impl ProviderConfig {
    pub fn new(cards_path: impl Into<PathBuf>, identifiers_path: impl Into<PathBuf>) -> Self {
        Self {
            cards_path: cards_path.into(),
            identifiers_path: identifiers_path.into(),
            card_back_url: DEFAULT_CARD_BACK_URL.to_string(),
            hosts: ImageHosts::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn with_card_back_url(mut self, url: impl Into<String>) -> Self {
        self.card_back_url = url.into();
        self
    }

    pub fn with_hosts(mut self, hosts: ImageHosts) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cards_path(&self) -> &Path {
        &self.cards_path
    }

    pub fn identifiers_path(&self) -> &Path {
        &self.identifiers_path
    }
}

/// Returns the default table directory: ~/.local/share/card_provider
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("card_provider")
}
