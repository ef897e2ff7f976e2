// Runtime key parsing.
//
// Keys look like `com.apple.CoreSimulator.SimRuntime.iOS-17-5`. Only
// the iOS form carries a version we can order by.

use std::sync::LazyLock;

use regex::Regex;

/// Namespace prefix the tool puts on every runtime key.
pub const RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

static IOS_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iOS-(\d+)-(\d+)").expect("static pattern is valid"));

fn ios_version(key: &str) -> Option<(u32, u32)> {
    let caps = IOS_VERSION.captures(key)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

/// Orderable version for a runtime key: `iOS-17-5` gives `17.5`.
/// Non-matching keys give `0.0`.
pub fn extract_version(key: &str) -> f64 {
    ios_version(key).map_or(0.0, |(major, minor)| {
        f64::from(major) + f64::from(minor) / 10.0
    })
}

/// Human label for a runtime key: `iOS 17.5`, or the key with its
/// namespace prefix removed.
pub fn format_display_name(key: &str) -> String {
    match ios_version(key) {
        Some((major, minor)) => format!("iOS {major}.{minor}"),
        None => key.replace(RUNTIME_PREFIX, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_from_ios_key() {
        assert!((extract_version("com.apple.CoreSimulator.SimRuntime.iOS-17-5") - 17.5).abs() < f64::EPSILON);
        assert!((extract_version("com.apple.CoreSimulator.SimRuntime.iOS-18-0") - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unversioned_keys_sort_last() {
        assert!(extract_version("com.apple.CoreSimulator.SimRuntime.watchOS-10-5").abs() < f64::EPSILON);
        assert!(extract_version("garbage").abs() < f64::EPSILON);
    }

    #[test]
    fn display_names() {
        assert_eq!(
            format_display_name("com.apple.CoreSimulator.SimRuntime.iOS-17-5"),
            "iOS 17.5"
        );
        assert_eq!(
            format_display_name("com.apple.CoreSimulator.SimRuntime.tvOS-17-0"),
            "tvOS-17-0"
        );
    }
}
