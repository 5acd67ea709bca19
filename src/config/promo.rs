//! Promo code table loading.
//!
//! The table is read once at startup from a TOML/JSON/YAML file (any format
//! the `config` crate understands) shaped as:
//!
//! ```toml
//! [codes.SAVE10]
//! kind = "percentage"
//! value = 10
//! description = "10% off"
//! ```
//!
//! Without a path the built-in table is used.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::ConfigError;
use crate::services::pricing::{PromoKind, PromoRule, PromoTable};

#[derive(Debug, Deserialize)]
struct PromoFile {
    #[serde(default)]
    codes: HashMap<String, PromoRule>,
}

pub fn load_promo_table(path: Option<&str>) -> Result<PromoTable, ConfigError> {
    let Some(path) = path else {
        return Ok(PromoTable::builtin());
    };

    let file: PromoFile = ::config::Config::builder()
        .add_source(::config::File::with_name(path))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|source| ConfigError::PromoFile {
            path: path.to_string(),
            source,
        })?;

    for (code, rule) in &file.codes {
        check_rule(code, rule)?;
    }

    info!("Loaded {} promo codes from {}", file.codes.len(), path);
    Ok(PromoTable::new(file.codes))
}

fn check_rule(code: &str, rule: &PromoRule) -> Result<(), ConfigError> {
    let reason = if code.trim().is_empty() {
        Some("code must not be blank")
    } else if rule.value < 0 {
        Some("value must not be negative")
    } else if rule.kind == PromoKind::Percentage && rule.value > 100 {
        Some("percentage must be at most 100")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::PromoRule {
            code: code.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn no_path_means_builtin_codes() {
        let table = load_promo_table(None).unwrap();
        assert_eq!(table, PromoTable::builtin());
        assert!(table.lookup("save10").is_some());
    }

    #[test]
    fn file_table_replaces_builtin() {
        let file = write_toml(
            r#"
            [codes.WINTER25]
            kind = "percentage"
            value = 25
            description = "25% off"

            [codes.FLAT50]
            kind = "flat"
            value = 50
            description = "50 off"
            "#,
        );

        let table = load_promo_table(file.path().to_str()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("winter25").unwrap().value, 25);
        assert_eq!(table.lookup("flat50").unwrap().kind, PromoKind::Flat);
        assert!(table.lookup("SAVE10").is_none());
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let file = write_toml(
            r#"
            [codes.TOOMUCH]
            kind = "percentage"
            value = 150
            description = "nope"
            "#,
        );

        let err = load_promo_table(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::PromoRule { .. }));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_promo_table(Some("/definitely/not/here/promos.toml")).unwrap_err();
        match err {
            ConfigError::PromoFile { path, .. } => assert!(path.ends_with("promos.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
