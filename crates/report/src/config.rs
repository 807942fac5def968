use std::str::FromStr;

use anyhow::{anyhow, Context};
use bigdecimal::BigDecimal;
use voyage_core::presenter::{PresenterOptions, DEFAULT_UPCOMING_LIMIT};
use voyage_core::types::{Date, DbId};

/// Report configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Package to report on.
    pub package_id: DbId,
    /// Price advertised when no chart is active.
    pub base_price: BigDecimal,
    /// As-of date; `None` means today's UTC date.
    pub as_of: Option<Date>,
    /// Presenter options (upcoming cap).
    pub presenter: PresenterOptions,
}

impl PricingConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Required | Default      |
    /// |------------------------|----------|--------------|
    /// | `DATABASE_URL`         | yes      | --           |
    /// | `PACKAGE_ID`           | yes      | --           |
    /// | `BASE_PRICE`           | yes      | --           |
    /// | `PRICING_AS_OF`        | no       | today (UTC)  |
    /// | `UPCOMING_CHART_LIMIT` | no       | `3`          |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let database_url = require("DATABASE_URL")?;

        let package_id: DbId = require("PACKAGE_ID")?
            .parse()
            .context("PACKAGE_ID must be a valid integer")?;

        let base_price = BigDecimal::from_str(&require("BASE_PRICE")?)
            .context("BASE_PRICE must be a decimal number")?;

        let as_of = lookup("PRICING_AS_OF")
            .map(|v| Date::from_str(&v))
            .transpose()
            .context("PRICING_AS_OF must be a YYYY-MM-DD date")?;

        let upcoming_limit: usize = match lookup("UPCOMING_CHART_LIMIT") {
            Some(v) => v
                .parse()
                .context("UPCOMING_CHART_LIMIT must be a non-negative integer")?,
            None => DEFAULT_UPCOMING_LIMIT,
        };

        Ok(Self {
            database_url,
            package_id,
            base_price,
            as_of,
            presenter: PresenterOptions { upcoming_limit },
        })
    }

    /// The effective as-of date.
    pub fn as_of_or_today(&self) -> Date {
        self.as_of.unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/voyage"),
            ("PACKAGE_ID", "12"),
            ("BASE_PRICE", "699.00"),
        ]
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = PricingConfig::from_lookup(lookup(&required())).unwrap();
        assert_eq!(config.package_id, 12);
        assert_eq!(config.base_price, BigDecimal::from(699));
        assert_eq!(config.as_of, None);
        assert_eq!(config.presenter, PresenterOptions::default());
    }

    #[test]
    fn optional_vars_are_parsed() {
        let mut vars = required();
        vars.push(("PRICING_AS_OF", "2025-07-15"));
        vars.push(("UPCOMING_CHART_LIMIT", "5"));
        let config = PricingConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.as_of, Date::from_ymd_opt(2025, 7, 15));
        assert_eq!(config.as_of_or_today(), Date::from_ymd_opt(2025, 7, 15).unwrap());
        assert_eq!(config.presenter.upcoming_limit, 5);
    }

    #[test]
    fn missing_required_var_is_reported() {
        let err = PricingConfig::from_lookup(lookup(&[("DATABASE_URL", "x")])).unwrap_err();
        assert!(err.to_string().contains("PACKAGE_ID"));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut vars = required();
        vars.push(("PRICING_AS_OF", "15/07/2025"));
        let err = PricingConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("PRICING_AS_OF"));
    }
}
