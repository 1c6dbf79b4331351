//! Layered settings: optional TOML file, then `RFV__*` environment variables

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::actions::ActionTable;
use crate::data::ColumnMap;
use crate::error::RfvError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Input column names
    pub columns: ColumnMap,
    /// Extra or replacement actions, keyed by score
    pub actions: BTreeMap<String, String>,
    /// Marker written to CSV for customers without an action
    pub csv_null_value: String,
}

impl Settings {
    /// Read `path` if it exists and apply environment overrides on top
    pub fn load(path: &Path) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(config::Environment::with_prefix("RFV").separator("__"))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        settings
            .try_deserialize()
            .context("failed to deserialise Settings")
    }

    /// Default actions with the configured overrides applied
    pub fn action_table(&self) -> Result<ActionTable, RfvError> {
        // config keys may arrive lowercased
        ActionTable::default().with_overrides(
            self.actions
                .iter()
                .map(|(score, action)| (score.to_ascii_uppercase(), action.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings.columns, ColumnMap::default());
        assert!(settings.actions.is_empty());
        assert_eq!(settings.csv_null_value, "");
        assert_eq!(settings.action_table().unwrap(), ActionTable::default());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "csv_null_value = \"NA\"").unwrap();
        writeln!(file, "[columns]").unwrap();
        writeln!(file, "customer = \"CustomerID\"").unwrap();
        writeln!(file, "amount = \"Total\"").unwrap();
        writeln!(file, "[actions]").unwrap();
        writeln!(file, "BAA = \"Oferecer programa de fidelidade\"").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.csv_null_value, "NA");
        assert_eq!(settings.columns.customer, "CustomerID");
        assert_eq!(settings.columns.amount, "Total");
        assert_eq!(settings.columns.date, "DiaCompra");

        let actions = settings.action_table().unwrap();
        assert_eq!(actions.len(), 5);
        assert_eq!(
            actions.lookup_str("BAA"),
            Some("Oferecer programa de fidelidade")
        );
    }

    #[test]
    fn test_invalid_action_key() {
        let settings = Settings {
            actions: BTreeMap::from([("QQQ".to_string(), "x".to_string())]),
            ..Settings::default()
        };
        assert!(settings.action_table().is_err());
    }
}
