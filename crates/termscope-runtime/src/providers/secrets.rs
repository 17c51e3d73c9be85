//! API key loading.
//!
//! Keys are held as [`SecretString`] from the moment they are read, so they
//! never show up in `Debug` output of configs, providers or errors.

use secrecy::SecretString;
use serde_json::Value as JsonValue;

use super::ProviderError;

/// Read `options[key]`, falling back to the `env_var` environment variable.
/// Blank values count as missing.
pub fn load_api_key(
    options: &JsonValue,
    key: &str,
    env_var: &str,
) -> Result<SecretString, ProviderError> {
    let from_config = options[key]
        .as_str()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string);
    let value = match from_config {
        Some(value) => value,
        None => std::env::var(env_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "API key required: set provider.{} in config or the {} environment variable",
                    key, env_var
                ))
            })?,
    };
    Ok(SecretString::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_config_key_wins_over_environment() {
        std::env::set_var("TERMSCOPE_TEST_KEY_CONFIG", "from-env");
        let key = load_api_key(
            &json!({"api_key": "from-config"}),
            "api_key",
            "TERMSCOPE_TEST_KEY_CONFIG",
        )
        .unwrap();
        assert_eq!(key.expose_secret(), "from-config");
    }

    #[test]
    fn test_blank_config_key_falls_back_to_environment() {
        std::env::set_var("TERMSCOPE_TEST_KEY_FALLBACK", "from-env");
        let key = load_api_key(&json!({"api_key": "  "}), "api_key", "TERMSCOPE_TEST_KEY_FALLBACK")
            .unwrap();
        assert_eq!(key.expose_secret(), "from-env");
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        std::env::remove_var("TERMSCOPE_TEST_KEY_MISSING");
        let err = load_api_key(&json!({}), "api_key", "TERMSCOPE_TEST_KEY_MISSING").unwrap_err();
        match err {
            ProviderError::NotConfigured(message) => {
                assert!(message.contains("provider.api_key"));
                assert!(message.contains("TERMSCOPE_TEST_KEY_MISSING"));
            }
            other => panic!("expected NotConfigured, got {:?}", other),
        }
    }

    #[test]
    fn test_key_is_redacted_in_debug() {
        let key = load_api_key(&json!({"api_key": "AIza-secret"}), "api_key", "UNUSED").unwrap();
        assert!(!format!("{:?}", key).contains("AIza-secret"));
    }
}
