//! Environment variable utilities
//!
//! Typed lookups with defaults, used by the configuration layer to apply
//! `MPR_*` overrides.
//!
//! ```ignore
//! use memprobe_core::env::{env_get, env_get_bool, env_get_count};
//!
//! let max_threads: usize = env_get("MPR_MAX_THREADS", 32);
//! let reuse = env_get_bool("MPR_REUSE_SLOTS", false);
//! let threshold = env_get_count("MPR_THRESHOLD", 1_000_000_000); // accepts "1e9"
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

/// Parse a non-negative count that may be written in float notation.
///
/// `"1000"`, `"1e9"` and `"2.5e6"` are all accepted. Negative, NaN and
/// out-of-range values are rejected.
pub fn parse_count(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    let v: f64 = s.parse().ok()?;
    if !v.is_finite() || v < 0.0 || v >= u64::MAX as f64 {
        return None;
    }
    Some(v as u64)
}

/// Get environment variable as a count (see [`parse_count`]), or default
#[inline]
pub fn env_get_count(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_count(&v))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_returns_defaults() {
        let val: usize = env_get("__MPR_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_bool("__MPR_TEST_UNSET__", true));
        assert!(env_get_opt::<usize>("__MPR_TEST_UNSET__").is_none());
        assert_eq!(env_get_str("__MPR_TEST_UNSET__", "x"), "x");
        assert_eq!(env_get_count("__MPR_TEST_UNSET__", 7), 7);
        assert!(!env_is_set("__MPR_TEST_UNSET__"));
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__MPR_TEST_NUM__", " 123 ");
        let val: usize = env_get("__MPR_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__MPR_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        for truthy in ["1", "true", "TRUE", "yes", "on"] {
            std::env::set_var("__MPR_TEST_BOOL__", truthy);
            assert!(env_get_bool("__MPR_TEST_BOOL__", false), "{}", truthy);
        }
        for falsy in ["0", "false", "garbage"] {
            std::env::set_var("__MPR_TEST_BOOL__", falsy);
            assert!(!env_get_bool("__MPR_TEST_BOOL__", true), "{}", falsy);
        }
        std::env::remove_var("__MPR_TEST_BOOL__");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1000"), Some(1000));
        assert_eq!(parse_count("1e9"), Some(1_000_000_000));
        assert_eq!(parse_count("2.5e3"), Some(2500));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("NaN"), None);
        assert_eq!(parse_count("1e30"), None);
        assert_eq!(parse_count("lots"), None);
    }

    #[test]
    fn test_env_get_count_invalid_falls_back() {
        std::env::set_var("__MPR_TEST_COUNT__", "not_a_number");
        assert_eq!(env_get_count("__MPR_TEST_COUNT__", 99), 99);
        std::env::set_var("__MPR_TEST_COUNT__", "4e2");
        assert_eq!(env_get_count("__MPR_TEST_COUNT__", 99), 400);
        std::env::remove_var("__MPR_TEST_COUNT__");
    }
}
