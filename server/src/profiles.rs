use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use platform_authz::{RoleConfig, Subject, null_as_default};
use serde::Deserialize;
use tracing::{info, warn};

/// Stored profile of one portal user.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role_config: RoleConfig,
}

/// Source of role configurations, keyed by user id.
pub trait ProfileStore: Send + Sync {
    fn profile(&self, user_id: &str) -> Option<Profile>;

    fn len(&self) -> usize;
}

/// Profiles loaded once at startup and never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, Profile>,
}

impl MemoryProfileStore {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let profiles: HashMap<String, Profile> =
            serde_json::from_str(raw).context("invalid profiles document")?;
        Ok(Self { profiles })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profiles from {}", path.display()))?;
        let store = Self::from_json_str(&raw)?;
        info!(path = %path.display(), profiles = store.len(), "profiles loaded");
        Ok(store)
    }

    pub fn with_profile(mut self, user_id: impl Into<String>, profile: Profile) -> Self {
        self.profiles.insert(user_id.into(), profile);
        self
    }
}

impl ProfileStore for MemoryProfileStore {
    fn profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.get(user_id).cloned()
    }

    fn len(&self) -> usize {
        self.profiles.len()
    }
}

/// Caller identity for one request, with its profile snapshot.
#[derive(Clone, Debug, Default)]
pub struct Caller {
    pub user_id: Option<String>,
    pub sector: Option<String>,
    pub role_config: Option<RoleConfig>,
}

impl Caller {
    /// The stored sector wins over the one forwarded by the gateway.
    pub fn resolve(store: &dyn ProfileStore, user_id: Option<&str>, sector: Option<&str>) -> Self {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Self::default();
        };
        let profile = store.profile(user_id);
        if profile.is_none() {
            warn!(user = user_id, "no stored profile for caller");
        }
        let stored_sector = profile.as_ref().and_then(|p| p.sector.clone());
        Self {
            user_id: Some(user_id.to_string()),
            sector: stored_sector.or_else(|| sector.map(str::to_string)),
            role_config: profile.map(|p| p.role_config),
        }
    }

    pub fn subject(&self) -> Subject<'_> {
        Subject::new(
            self.role_config.as_ref(),
            self.user_id.as_deref(),
            self.sector.as_deref(),
        )
    }
}
