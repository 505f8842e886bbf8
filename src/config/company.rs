use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::money::LocaleConfig;
use crate::plan::{OverflowPolicy, MAX_INSTALLMENTS};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: Company,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub installments: InstallmentSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Offset from UTC used to decide what "today" is for the company.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Company {
    pub fn today(&self) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
            None => Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct InstallmentSettings {
    pub default_count: u32,
    pub max_count: u32,
    pub overflow_policy: OverflowPolicy,
}

impl Default for InstallmentSettings {
    fn default() -> Self {
        Self {
            default_count: 1,
            max_count: 360,
            overflow_policy: OverflowPolicy::Reject,
        }
    }
}

impl InstallmentSettings {
    /// Refuse counts above `max_count` (never more than the planner allows).
    pub fn check_count(&self, count: i64) -> Result<()> {
        let max = self.max_count.min(MAX_INSTALLMENTS);
        if count > i64::from(max) {
            return Err(LedgerError::TooManyInstallments { count, max });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_above_the_configured_maximum_are_refused() {
        let settings = InstallmentSettings::default();
        assert!(settings.check_count(360).is_ok());
        assert!(settings.check_count(0).is_ok());
        assert!(matches!(
            settings.check_count(4_000_000_000),
            Err(LedgerError::TooManyInstallments { max: 360, .. })
        ));

        let generous = InstallmentSettings {
            max_count: u32::MAX,
            ..InstallmentSettings::default()
        };
        assert!(matches!(
            generous.check_count(i64::from(MAX_INSTALLMENTS) + 1),
            Err(LedgerError::TooManyInstallments { max: MAX_INSTALLMENTS, .. })
        ));
    }
}
