//! Register configuration.

use chrono::FixedOffset;
use serde::Deserialize;

use mostrador_core::{DomainError, DomainResult};

/// Tunable settings for the register engine.
///
/// Defaults mirror the shop's production values: an Argentina wall clock
/// (UTC-3), the 30-day return window, 90-day credit notes, and the
/// historical sequence bases for human-readable codes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    /// Local wall-clock offset from UTC, in minutes.
    pub timezone_offset_minutes: i32,
    /// Days after creation during which a sale accepts returns.
    pub return_window_days: i64,
    /// Credit-note validity, in days from issuance.
    pub credit_note_validity_days: i64,
    pub sale_code_base: u64,
    pub ticket_code_base: u64,
    pub return_code_base: u64,
    pub credit_note_code_base: u64,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            timezone_offset_minutes: -180,
            return_window_days: 30,
            credit_note_validity_days: 90,
            sale_code_base: 1000,
            ticket_code_base: 1,
            return_code_base: 1,
            credit_note_code_base: 1000,
        }
    }
}

impl RegisterConfig {
    pub fn timezone(&self) -> DomainResult<FixedOffset> {
        FixedOffset::east_opt(self.timezone_offset_minutes * 60)
            .ok_or_else(|| DomainError::validation("timezone offset out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shop_settings() {
        let config = RegisterConfig::default();
        assert_eq!(config.return_window_days, 30);
        assert_eq!(config.credit_note_validity_days, 90);
        assert_eq!(config.sale_code_base, 1000);
        assert_eq!(config.timezone().unwrap().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn partial_json_overrides_fall_back_to_defaults() {
        let config: RegisterConfig =
            serde_json::from_str(r#"{ "return_window_days": 14 }"#).unwrap();
        assert_eq!(config.return_window_days, 14);
        assert_eq!(config.credit_note_validity_days, 90);
    }

    #[test]
    fn absurd_offsets_are_rejected() {
        let config = RegisterConfig {
            timezone_offset_minutes: 100_000,
            ..RegisterConfig::default()
        };
        assert!(config.timezone().is_err());
    }
}
