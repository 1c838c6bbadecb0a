//! Environment variable helpers.
//!
//! The core never reads configuration files; the only external interface
//! a caller can use to tune it is the environment. This is the concrete
//! form of `GetEnvironmentValue(name)`: an empty/unset variable falls back
//! to the caller-supplied default rather than erroring.

use std::str::FromStr;

/// Parse an environment variable as `T`, or return `default` if unset or
/// unparsable.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an environment variable as a boolean.
///
/// Accepts `"1"`, `"true"`, `"yes"`, `"on"` (case-insensitive) as true;
/// everything else, including unset, yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Parse an environment variable as `Option<T>`.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Read an environment variable as a string, or `default` if unset.
///
/// The spec's `GetEnvironmentValue(name)` is this with `default = ""`.
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Whether an environment variable is set, regardless of its value.
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_on_unset() {
        let val: usize = env_get("__ABE_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn bool_variants() {
        std::env::set_var("__ABE_TEST_BOOL__", "Yes");
        assert!(env_get_bool("__ABE_TEST_BOOL__", false));
        std::env::set_var("__ABE_TEST_BOOL__", "0");
        assert!(!env_get_bool("__ABE_TEST_BOOL__", true));
        std::env::remove_var("__ABE_TEST_BOOL__");
    }

    #[test]
    fn opt_none_when_unset() {
        let val: Option<usize> = env_get_opt("__ABE_TEST_UNSET__");
        assert!(val.is_none());
    }

    #[test]
    fn get_environment_value_semantics() {
        assert_eq!(env_get_str("__ABE_TEST_UNSET__", ""), "");
        std::env::set_var("__ABE_TEST_STR__", "hello");
        assert_eq!(env_get_str("__ABE_TEST_STR__", ""), "hello");
        std::env::remove_var("__ABE_TEST_STR__");
    }

    #[test]
    fn is_set_tracks_presence() {
        assert!(!env_is_set("__ABE_TEST_UNSET__"));
        assert!(env_is_set("PATH"));
    }
}
