//! Environment lookups for the GeoTrack configuration.
//!
//! Plain settings are overridden with `GEOTRACK__SECTION__KEY` by the loader.
//! A string value equal to [`SECRET_MARKER`] at path `section.key` is replaced
//! with `GEOTRACK_SECRET_SECTION_KEY`, or with the conventional variable from
//! [`WELL_KNOWN_VARS`] when the prefixed one is unset.

use serde_json::Value;
use std::env;

pub const SECRET_MARKER: &str = "secret_from_env";

/// Prefix of the `GEOTRACK__SECTION__KEY` overrides.
pub const CONFIG_PREFIX: &str = "GEOTRACK";
pub const CONFIG_SEPARATOR: &str = "__";

const SECRET_PREFIX: &str = "GEOTRACK_SECRET_";

/// Unprefixed names accepted for the deployment secrets.
pub const WELL_KNOWN_VARS: &[(&str, &str)] = &[
    ("database.url", "DATABASE_URL"),
    ("encryption.key_base64", "ENCRYPTION_KEY_BASE64"),
    ("traccar.base_url", "TRACCAR_BASE_URL"),
    ("traccar.username", "TRACCAR_USERNAME"),
    ("traccar.password", "TRACCAR_PASSWORD"),
    ("wialon.default_base_url", "WIALON_BASE_URL"),
];

/// `traccar.password` -> `GEOTRACK_SECRET_TRACCAR_PASSWORD`
pub fn secret_env_var(path: &str) -> String {
    format!("{SECRET_PREFIX}{}", path.replace('.', "_").to_uppercase())
}

fn lookup_secret(path: &str) -> Option<String> {
    env::var(secret_env_var(path)).ok().or_else(|| {
        WELL_KNOWN_VARS
            .iter()
            .find(|(known, _)| *known == path)
            .and_then(|(_, var)| env::var(var).ok())
    })
}

/// Replaces every marker in `value` and returns the paths that had no
/// matching variable. Unresolved markers are left in place.
pub fn resolve_secret_markers(value: &mut Value) -> Vec<String> {
    let mut unresolved = Vec::new();
    resolve_at("", value, &mut unresolved);
    unresolved
}

fn resolve_at(path: &str, value: &mut Value, unresolved: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                resolve_at(&child_path, child, unresolved);
            }
        }
        Value::String(s) if s == SECRET_MARKER => match lookup_secret(path) {
            Some(secret) => *s = secret,
            None => unresolved.push(path.to_string()),
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_env_var_names() {
        assert_eq!(secret_env_var("traccar.password"), "GEOTRACK_SECRET_TRACCAR_PASSWORD");
        assert_eq!(
            secret_env_var("encryption.key_base64"),
            "GEOTRACK_SECRET_ENCRYPTION_KEY_BASE64"
        );
    }

    #[test]
    fn test_prefixed_variable_replaces_marker() {
        std::env::set_var("GEOTRACK_SECRET_TRACCAR_RESOLVE_TEST", "hunter2");
        let mut value = serde_json::json!({
            "traccar": {
                "base_url": "http://localhost:8082/api",
                "resolve_test": "secret_from_env"
            }
        });

        let unresolved = resolve_secret_markers(&mut value);
        assert!(unresolved.is_empty());
        assert_eq!(value["traccar"]["resolve_test"], "hunter2");
        assert_eq!(value["traccar"]["base_url"], "http://localhost:8082/api");
    }

    #[test]
    fn test_well_known_variable_is_the_fallback() {
        std::env::remove_var("GEOTRACK_SECRET_WIALON_DEFAULT_BASE_URL");
        std::env::set_var("WIALON_BASE_URL", "https://wialon.internal");
        let mut value = serde_json::json!({
            "wialon": { "default_base_url": "secret_from_env" }
        });

        assert!(resolve_secret_markers(&mut value).is_empty());
        assert_eq!(value["wialon"]["default_base_url"], "https://wialon.internal");
    }

    #[test]
    fn test_missing_variables_are_reported_not_replaced() {
        let mut value = serde_json::json!({
            "encryption": { "unset_resolve_test_key": "secret_from_env" },
            "jobs": { "enabled": true }
        });

        let unresolved = resolve_secret_markers(&mut value);
        assert_eq!(unresolved, vec!["encryption.unset_resolve_test_key".to_string()]);
        assert_eq!(value["encryption"]["unset_resolve_test_key"], SECRET_MARKER);
    }
}
