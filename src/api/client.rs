//! API client - resolves a profile into a ready transport and dispatch settings

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::credentials::{load_credentials, load_profile_settings, ProfileSettings};
use super::http::{ApiHttpClient, DEFAULT_TIMEOUT_SECS};
use crate::resource::{DispatchOptions, OperationCatalog, DEFAULT_ENVELOPE_KEY, DEFAULT_PAGE_SIZE};

/// Command-line overrides applied on top of the profile
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub continue_on_fail: bool,
}

/// Resolved settings for one session
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub base_url: String,
    pub envelope_key: String,
    pub page_size: u64,
    pub timeout: Duration,
    pub catalog_path: Option<PathBuf>,
    pub continue_on_fail: bool,
}

impl ClientSettings {
    /// Merge overrides, profile settings and the credentials' base URL, in that order
    pub fn resolve(
        profile: &str,
        settings: ProfileSettings,
        credentials_base_url: Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let base_url = overrides
            .base_url
            .clone()
            .or(credentials_base_url)
            .or(settings.base_url)
            .ok_or_else(|| anyhow!("No base URL configured for profile '{}'", profile))?;

        Ok(Self {
            base_url,
            envelope_key: settings
                .envelope_key
                .unwrap_or_else(|| DEFAULT_ENVELOPE_KEY.to_string()),
            page_size: settings.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
            timeout: Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            catalog_path: overrides.catalog_path.clone().or(settings.catalog_path),
            continue_on_fail: overrides.continue_on_fail,
        })
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            envelope_key: self.envelope_key.clone(),
            default_page_size: self.page_size,
            continue_on_fail: self.continue_on_fail,
        }
    }
}

/// Container for the HTTP transport and its settings
pub struct ApiClient {
    pub http: ApiHttpClient,
    pub settings: ClientSettings,
    pub profile: String,
}

impl ApiClient {
    /// Create a client for a given profile
    pub fn new(profile: &str, overrides: &Overrides) -> Result<Self> {
        let credentials = load_credentials(profile)?;
        let profile_settings = load_profile_settings(profile)?;
        let settings = ClientSettings::resolve(
            profile,
            profile_settings,
            credentials.base_url.clone(),
            overrides,
        )?;

        let http = ApiHttpClient::new(&credentials, &settings.base_url, settings.timeout)
            .with_context(|| format!("Could not create HTTP client for profile '{}'", profile))?;

        Ok(Self {
            http,
            settings,
            profile: profile.to_string(),
        })
    }

    /// The configured catalog file, or the built-in catalog
    pub fn catalog(&self) -> Result<OperationCatalog> {
        load_catalog(self.settings.catalog_path.as_deref())
    }
}

pub fn load_catalog(path: Option<&Path>) -> Result<OperationCatalog> {
    match path {
        Some(path) => OperationCatalog::from_file(path)
            .with_context(|| format!("Could not load catalog {:?}", path)),
        None => Ok(OperationCatalog::builtin()?.clone()),
    }
}
