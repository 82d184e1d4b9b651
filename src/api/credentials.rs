//! API credentials and profile settings
//!
//! Supports:
//! - Environment variables (MAILROOM_API_KEY, MAILROOM_BASE_URL) for the default profile
//! - Profiles in ~/.mailroom/credentials (or MAILROOM_CREDENTIALS_FILE)
//! - Profiles in ~/.mailroom/config (or MAILROOM_CONFIG_FILE), which also
//!   carries the non-secret dispatcher settings

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "MAILROOM_API_KEY";
pub const BASE_URL_ENV: &str = "MAILROOM_BASE_URL";
pub const CONFIG_FILE_ENV: &str = "MAILROOM_CONFIG_FILE";
pub const CREDENTIALS_FILE_ENV: &str = "MAILROOM_CREDENTIALS_FILE";

/// API credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    /// Base URL stored alongside the key, if any
    pub base_url: Option<String>,
}

/// Non-secret settings of one profile; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSettings {
    pub base_url: Option<String>,
    pub envelope_key: Option<String>,
    pub page_size: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub catalog_path: Option<PathBuf>,
}

/// Load credentials for a given profile
pub fn load_credentials(profile: &str) -> Result<Credentials> {
    // 1. Environment variables (default profile only)
    if profile == "default" {
        if let Ok(creds) = load_from_env() {
            debug!("Loaded credentials from environment variables");
            return Ok(creds);
        }
    }

    // 2. Credentials file
    match load_from_credentials_file(profile) {
        Ok(creds) => {
            debug!(
                "Loaded credentials from credentials file for profile '{}'",
                profile
            );
            return Ok(creds);
        }
        Err(e) => debug!("Credentials file lookup failed: {}", e),
    }

    // 3. Config file with an inline key
    if let Ok(creds) = load_from_config_file(profile) {
        debug!(
            "Loaded credentials from config file for profile '{}'",
            profile
        );
        return Ok(creds);
    }

    Err(anyhow!(
        "No API key found for profile '{}'. Set {} or add api_key to the credentials file",
        profile,
        API_KEY_ENV
    ))
}

/// Load credentials from environment variables
fn load_from_env() -> Result<Credentials> {
    let api_key = env::var(API_KEY_ENV).map_err(|_| anyhow!("{} not set", API_KEY_ENV))?;
    if api_key.trim().is_empty() {
        return Err(anyhow!("{} is empty", API_KEY_ENV));
    }

    Ok(Credentials {
        api_key,
        base_url: env::var(BASE_URL_ENV).ok().filter(|s| !s.is_empty()),
    })
}

/// Get the mailroom config directory
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_FILE_ENV) {
        if let Some(parent) = PathBuf::from(path).parent() {
            return Ok(parent.to_path_buf());
        }
    }

    dirs::home_dir()
        .map(|h| h.join(".mailroom"))
        .ok_or_else(|| anyhow!("Could not find home directory"))
}

fn config_file_path() -> Result<PathBuf> {
    match env::var(CONFIG_FILE_ENV) {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => Ok(config_dir()?.join("config")),
    }
}

fn credentials_file_path() -> Result<PathBuf> {
    match env::var(CREDENTIALS_FILE_ENV) {
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => Ok(config_dir()?.join("credentials")),
    }
}

/// Parse an INI-style file into sections.
/// `[profile name]` headers are stored under `name`.
fn parse_ini_file(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current_section = String::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            current_section = line[1..line.len() - 1].trim().to_string();
            if let Some(name) = current_section.strip_prefix("profile ") {
                current_section = name.trim().to_string();
            }
            sections.entry(current_section.clone()).or_default();
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            if !current_section.is_empty() {
                sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }

    sections
}

fn read_profile(path: &Path, profile: &str) -> Result<HashMap<String, String>> {
    let content =
        fs::read_to_string(path).map_err(|_| anyhow!("Could not read {:?}", path))?;
    parse_ini_file(&content)
        .remove(profile)
        .ok_or_else(|| anyhow!("Profile '{}' not found in {:?}", profile, path))
}

fn credentials_from_section(
    section: &HashMap<String, String>,
    profile: &str,
) -> Result<Credentials> {
    let api_key = section
        .get("api_key")
        .filter(|k| !k.is_empty())
        .ok_or_else(|| anyhow!("api_key not found for profile '{}'", profile))?
        .clone();

    Ok(Credentials {
        api_key,
        base_url: section.get("base_url").cloned(),
    })
}

fn load_from_credentials_file(profile: &str) -> Result<Credentials> {
    let section = read_profile(&credentials_file_path()?, profile)?;
    credentials_from_section(&section, profile)
}

fn load_from_config_file(profile: &str) -> Result<Credentials> {
    let section = read_profile(&config_file_path()?, profile)?;
    credentials_from_section(&section, profile)
}

/// Load the non-secret settings of a profile from the config file.
/// A missing file or profile yields empty settings.
pub fn load_profile_settings(profile: &str) -> Result<ProfileSettings> {
    let path = config_file_path()?;
    if !path.exists() {
        debug!("No config file at {:?}", path);
        return Ok(ProfileSettings::default());
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("Could not read {:?}", path))?;
    let sections = parse_ini_file(&content);
    match sections.get(profile) {
        Some(section) => settings_from_section(section, profile),
        None => Ok(ProfileSettings::default()),
    }
}

fn settings_from_section(
    section: &HashMap<String, String>,
    profile: &str,
) -> Result<ProfileSettings> {
    let parse_number = |key: &str| -> Result<Option<u64>> {
        section
            .get(key)
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("Invalid {} '{}' in profile '{}'", key, v, profile))
            })
            .transpose()
    };

    Ok(ProfileSettings {
        base_url: section.get("base_url").cloned(),
        envelope_key: section.get("envelope_key").cloned(),
        page_size: parse_number("page_size")?,
        timeout_secs: parse_number("timeout_secs")?,
        catalog_path: section.get("catalog_path").map(PathBuf::from),
    })
}

/// List profile names from config and credentials files
pub fn list_profiles() -> Vec<String> {
    let mut profiles = vec!["default".to_string()];

    for path in [config_file_path(), credentials_file_path()]
        .into_iter()
        .flatten()
    {
        if let Ok(content) = fs::read_to_string(&path) {
            for name in parse_ini_file(&content).into_keys() {
                if !profiles.contains(&name) {
                    profiles.push(name);
                }
            }
        }
    }

    profiles.sort();
    profiles
}

/// Mask sensitive values for logging
pub fn mask_credential(value: &str) -> String {
    if value.len() <= 8 {
        "*".repeat(value.len())
    } else {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ini_file() {
        let content = r#"
# comment
[default]
api_key = key_default

[profile staging]
api_key = key_staging
base_url = https://staging.example.com/v1
"#;
        let sections = parse_ini_file(content);

        assert!(sections.contains_key("default"));
        assert!(sections.contains_key("staging")); // "profile " prefix stripped
        assert_eq!(
            sections["staging"].get("base_url").unwrap(),
            "https://staging.example.com/v1"
        );
    }

    #[test]
    fn test_credentials_from_section() {
        let sections = parse_ini_file("[work]\napi_key = abc\n");
        let creds = credentials_from_section(&sections["work"], "work").unwrap();
        assert_eq!(creds.api_key, "abc");
        assert_eq!(creds.base_url, None);

        let sections = parse_ini_file("[work]\napi_key =\n");
        assert!(credentials_from_section(&sections["work"], "work").is_err());
    }

    #[test]
    fn test_settings_from_section() {
        let sections = parse_ini_file(
            "[default]\nbase_url = https://api.example.com\npage_size = 50\nenvelope_key = items\n",
        );
        let settings = settings_from_section(&sections["default"], "default").unwrap();
        assert_eq!(settings.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(settings.page_size, Some(50));
        assert_eq!(settings.envelope_key.as_deref(), Some("items"));
        assert_eq!(settings.timeout_secs, None);
    }

    #[test]
    fn test_settings_reject_bad_number() {
        let sections = parse_ini_file("[default]\npage_size = lots\n");
        let err = settings_from_section(&sections["default"], "default").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential("short"), "*****");
        assert_eq!(mask_credential("abcdefghijklmnop"), "abcd...mnop");
    }
}
