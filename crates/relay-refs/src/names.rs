//! Branch name rules.
//!
//! Branch names follow git conventions so that every name maps to a safe
//! relative file path under `refs/heads/`:
//!
//! - non-empty, no whitespace or any of `~ ^ : ? * [ \`
//! - no `..`, no `@{`
//! - no leading or trailing `.` or `/`, no `.lock` suffix
//! - `/`-separated components are non-empty and never start with `.`
//!
//! The name `all` is reserved: it selects every branch in a query scope.

use crate::error::{RefError, Result};

/// Selector value meaning "every branch" (or "every repository").
pub const ALL_SCOPE: &str = "all";

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a branch name.
///
/// ```
/// use relay_refs::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("bad..name").is_err());
/// assert!(validate_branch_name("all").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: String| {
        Err(RefError::InvalidBranchName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("must not be empty".into());
    }
    if name == ALL_SCOPE {
        return invalid(format!("'{ALL_SCOPE}' is reserved"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return invalid(format!("contains forbidden character {ch:?}"));
    }
    for seq in ["..", "@{", "//"] {
        if name.contains(seq) {
            return invalid(format!("must not contain '{seq}'"));
        }
    }
    if name.starts_with(['.', '/']) || name.ends_with(['.', '/']) {
        return invalid("must not start or end with '.' or '/'".into());
    }
    if name.ends_with(".lock") {
        return invalid("must not end with '.lock'".into());
    }
    if name.split('/').any(|c| c.starts_with('.')) {
        return invalid("path components must not start with '.'".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_names() {
        for name in ["main", "draft", "feature/auth", "release-1.2", "a/b/c", "v2_x"] {
            assert!(validate_branch_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_bad_names() {
        for name in [
            "",
            "all",
            "has space",
            "tab\there",
            "a..b",
            "x@{1}",
            ".hidden",
            "trailing.",
            "/lead",
            "trail/",
            "a//b",
            "main.lock",
            "feature/.secret",
            "what?",
            "star*",
            "back\\slash",
        ] {
            assert!(validate_branch_name(name).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn error_carries_name_and_reason() {
        match validate_branch_name("a..b").unwrap_err() {
            RefError::InvalidBranchName { name, reason } => {
                assert_eq!(name, "a..b");
                assert!(reason.contains(".."));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
