use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::models::RuleOverride;

/// Static recommendation overrides, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub rules: Vec<RuleOverride>,
}

impl RulesConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;

        let config: RulesConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;

        Ok(config)
    }

    /// Rules are optional: an unreadable or malformed file means no overrides.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded {} rule overrides from {}", config.rules.len(), path.display());
                config
            }
            Err(e) => {
                warn!("Using no rule overrides: {:#}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_rules_deserialize() {
        let config: RulesConfig = serde_json::from_str(
            r#"{"rules": [
                {"id": "rule-holiday", "campaign": "Toys", "action": "Decrease Bids"},
                {"explanation": "Always keep brand terms funded"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].id.as_deref(), Some("rule-holiday"));
        assert_eq!(config.rules[0].benefit, None);
        assert_eq!(config.rules[1].id, None);
        assert_eq!(
            config.rules[1].explanation.as_deref(),
            Some("Always keep brand terms funded")
        );
    }

    #[test]
    fn test_missing_rules_key_is_empty() {
        let config: RulesConfig = serde_json::from_str("{}").unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_missing_file_yields_no_rules() {
        let config = RulesConfig::load_or_default(Path::new("/no/such/rules.json"));
        assert!(config.rules.is_empty());
    }
}
