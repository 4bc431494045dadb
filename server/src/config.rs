use std::path::PathBuf;

use anyhow::{Context, Result};
use platform_authz::FormListing;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub profiles_path: Option<PathBuf>,
    pub form_listing: FormListing,
    pub cors_allowed_origins: Vec<String>,
    pub user_header: String,
    pub sector_header: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let profiles_path = lookup("PORTAL_PROFILES_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let form_listing = match lookup("PORTAL_FORM_LISTING") {
            Some(raw) => raw
                .parse::<FormListing>()
                .context("invalid PORTAL_FORM_LISTING")?,
            None => FormListing::default(),
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let user_header = lookup("PORTAL_USER_HEADER")
            .unwrap_or_else(|| "x-portal-user".into())
            .to_ascii_lowercase();
        let sector_header = lookup("PORTAL_SECTOR_HEADER")
            .unwrap_or_else(|| "x-portal-sector".into())
            .to_ascii_lowercase();

        Ok(Self {
            profiles_path,
            form_listing,
            cors_allowed_origins,
            user_header,
            sector_header,
        })
    }
}
