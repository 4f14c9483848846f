use anyhow::Context;
use paging::PaginationPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the records module (`records:` section of the server config).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordsConfig {
    /// HMAC secret for session tokens. Empty disables authentication: no caller
    /// is ever identified.
    #[serde(default)]
    pub jwt_secret: String,
    /// Name of the query parameter, header and cookie carrying the session token.
    #[serde(default = "default_session_key")]
    pub session_key: String,
    #[serde(default = "default_applications_page")]
    pub applications: PageLimits,
    #[serde(default = "default_users_page")]
    pub users: PageLimits,
    #[serde(default = "default_catalog_page")]
    pub catalog: PageLimits,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_key: default_session_key(),
            applications: default_applications_page(),
            users: default_users_page(),
            catalog: default_catalog_page(),
        }
    }
}

impl RecordsConfig {
    /// Parse the raw section. A missing section (`null`) yields the defaults.
    pub fn from_value(raw: &serde_json::Value) -> anyhow::Result<Self> {
        if raw.is_null() {
            return Ok(Self::default());
        }
        let cfg: Self =
            serde_json::from_value(raw.clone()).context("invalid `records` config section")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, limits) in [
            ("applications", self.applications),
            ("users", self.users),
            ("catalog", self.catalog),
        ] {
            if limits.default_limit == 0 || limits.default_limit > limits.max_limit {
                anyhow::bail!(
                    "records.{name}: default_limit must be in 1..={} (got {})",
                    limits.max_limit,
                    limits.default_limit
                );
            }
        }
        if self.session_key.trim().is_empty() {
            anyhow::bail!("records.session_key must not be empty");
        }
        Ok(())
    }

    pub fn applications_policy(&self) -> PaginationPolicy {
        PaginationPolicy::new(
            self.applications.default_limit,
            self.applications.max_limit,
        )
        .with_sort_key("date_created", "created_at")
        .with_sort_key("status", "status")
    }

    pub fn users_policy(&self) -> PaginationPolicy {
        PaginationPolicy::new(self.users.default_limit, self.users.max_limit)
            .with_sort_key("date_created", "created_at")
            .with_sort_key("last_name", "last_name")
    }

    pub fn catalog_policy(&self) -> PaginationPolicy {
        PaginationPolicy::new(self.catalog.default_limit, self.catalog.max_limit)
            .with_sort_key("title", "title")
    }
}

fn default_session_key() -> String {
    "gkhsession".to_string()
}

fn default_applications_page() -> PageLimits {
    PageLimits {
        default_limit: 25,
        max_limit: 50,
    }
}

fn default_users_page() -> PageLimits {
    PageLimits {
        default_limit: 25,
        max_limit: 50,
    }
}

fn default_catalog_page() -> PageLimits {
    PageLimits {
        default_limit: 50,
        max_limit: 100,
    }
}
