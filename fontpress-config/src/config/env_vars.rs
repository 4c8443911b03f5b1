//! `${VAR}` expansion in raw config text.
//!
//! Expansion runs on the YAML source before it is deserialized. Only names in
//! [`ALLOWED_ENV_VARS`] or under the `FONTPRESS_` and `AWS_` prefixes are
//! looked up unless the file opts out with `allow_all_env_vars: true`, so a
//! shared config cannot read unrelated secrets such as `GITHUB_TOKEN`.
//!
//! Syntax:
//!
//! - `${NAME}` expands to the value of `NAME`; unset names stay verbatim.
//! - `${NAME:-fallback}` uses `fallback` when `NAME` is unset. A `}` inside
//!   the fallback is written `\}`.
//! - `$${NAME}` is the literal text `${NAME}`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// One token: an escaped `$${`, or a reference with an optional fallback.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$\{|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-((?:[^}\\]|\\.)*))?\}")
        .expect("reference pattern is valid")
});

/// Top-level `allow_all_env_vars: true`, with an optional trailing comment.
static ALLOW_ALL_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^allow_all_env_vars:[ \t]*true[ \t]*(?:#.*)?$")
        .expect("allow_all_env_vars pattern is valid")
});

/// Names outside the `FONTPRESS_` / `AWS_` prefixes that configs may use,
/// mostly for building cache and credential paths.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "HOME",
    "USER",
    "USERNAME",
    "USERPROFILE",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "XDG_STATE_HOME",
    "XDG_CACHE_HOME",
    "XDG_RUNTIME_DIR",
    "TMPDIR",
    "TEMP",
    "TMP",
    "APPDATA",
    "LOCALAPPDATA",
];

const ALLOWED_PREFIXES: &[&str] = &["FONTPRESS_", "AWS_"];

pub fn is_env_var_allowed(var_name: &str) -> bool {
    ALLOWED_ENV_VARS.contains(&var_name)
        || ALLOWED_PREFIXES
            .iter()
            .any(|prefix| var_name.starts_with(prefix))
}

// ----------------------------------------------------------------------------
// Expansion
// ----------------------------------------------------------------------------

/// Result of expanding one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Allowed names that were unset and had no fallback.
    pub unresolved: Vec<String>,
    /// Names skipped because they are not on the allowlist.
    pub blocked: Vec<String>,
}

/// Expands references against a lookup function.
pub struct Expander<F> {
    lookup: F,
    allow_all: bool,
}

impl Expander<fn(&str) -> Option<String>> {
    /// Expander backed by the process environment.
    pub fn from_env(allow_all: bool) -> Self {
        Self {
            lookup: process_env,
            allow_all,
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl<F> Expander<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F, allow_all: bool) -> Self {
        Self { lookup, allow_all }
    }

    pub fn expand(&self, input: &str) -> Expansion {
        let mut unresolved = Vec::new();
        let mut blocked = Vec::new();

        let text = REFERENCE.replace_all(input, |caps: &Captures| {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                return "${".to_string();
            };
            let verbatim = caps[0].to_string();

            if !self.allow_all && !is_env_var_allowed(name) {
                push_once(&mut blocked, name);
                return verbatim;
            }
            if let Some(value) = (self.lookup)(name) {
                return value;
            }
            match caps.get(2) {
                Some(fallback) => fallback.as_str().replace("\\}", "}"),
                None => {
                    push_once(&mut unresolved, name);
                    verbatim
                }
            }
        });

        Expansion {
            text: text.into_owned(),
            unresolved,
            blocked,
        }
    }
}

fn push_once(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// Expand against the process environment with the default allowlist.
pub fn substitute_variables(input: &str) -> String {
    substitute_variables_with_allowlist(input, false)
}

/// Expand against the process environment. Skipped and unset names are
/// logged once per document.
pub fn substitute_variables_with_allowlist(input: &str, allow_all: bool) -> String {
    let expansion = Expander::from_env(allow_all).expand(input);
    if !expansion.blocked.is_empty() {
        log::warn!(
            "Config references environment variables outside the allowlist, left as-is: {}. \
             Set `allow_all_env_vars: true` to expand them.",
            expansion.blocked.join(", ")
        );
    }
    if !expansion.unresolved.is_empty() {
        log::debug!(
            "Config references unset environment variables: {}",
            expansion.unresolved.join(", ")
        );
    }
    expansion.text
}

/// Whether the raw document opts into unrestricted expansion. Read before
/// deserializing because expansion happens first.
pub(crate) fn pre_scan_allow_all_env_vars(raw_yaml: &str) -> bool {
    ALLOW_ALL_KEY.is_match(raw_yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_allowlist_prefixes() {
        assert!(is_env_var_allowed("HOME"));
        assert!(is_env_var_allowed("FONTPRESS_BUCKET"));
        assert!(is_env_var_allowed("AWS_REGION"));
        assert!(!is_env_var_allowed("GITHUB_TOKEN"));
        assert!(!is_env_var_allowed("PATH"));
    }

    #[test]
    fn test_expands_set_variables() {
        let expander = Expander::new(env(&[("FONTPRESS_BUCKET", "fonts-prod")]), false);
        let out = expander.expand("bucket: ${FONTPRESS_BUCKET}\nalso: ${FONTPRESS_BUCKET:-x}");
        assert_eq!(out.text, "bucket: fonts-prod\nalso: fonts-prod");
        assert!(out.unresolved.is_empty());
        assert!(out.blocked.is_empty());
    }

    #[test]
    fn test_fallback_used_when_unset() {
        let out = Expander::new(env(&[]), false).expand("bucket: ${FONTPRESS_BUCKET:-a\\}b}");
        assert_eq!(out.text, "bucket: a}b");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn test_unset_without_fallback_reported() {
        let input = "bucket: ${FONTPRESS_BUCKET} ${FONTPRESS_BUCKET}";
        let out = Expander::new(env(&[]), false).expand(input);
        assert_eq!(out.text, input);
        assert_eq!(out.unresolved, vec!["FONTPRESS_BUCKET".to_string()]);
    }

    #[test]
    fn test_blocked_names_left_verbatim() {
        let lookup = env(&[("GITHUB_TOKEN", "secret")]);
        let input = "token: ${GITHUB_TOKEN:-none}";

        let out = Expander::new(&lookup, false).expand(input);
        assert_eq!(out.text, input);
        assert_eq!(out.blocked, vec!["GITHUB_TOKEN".to_string()]);

        let out = Expander::new(&lookup, true).expand(input);
        assert_eq!(out.text, "token: secret");
        assert!(out.blocked.is_empty());
    }

    #[test]
    fn test_escaped_reference() {
        let out = Expander::new(env(&[("HOME", "/home/me")]), false)
            .expand("literal: $${HOME} real: ${HOME}");
        assert_eq!(out.text, "literal: ${HOME} real: /home/me");
    }

    #[test]
    fn test_process_env_wrappers() {
        assert_eq!(
            substitute_variables("bucket: ${FONTPRESS_TEST_SURELY_UNSET_VAR:-fonts}"),
            "bucket: fonts"
        );
        assert_eq!(
            substitute_variables_with_allowlist("x: ${FONTPRESS_TEST_UNSET_PRIVATE_NAME_Q:-y}", true),
            "x: y"
        );
    }

    #[test]
    fn test_pre_scan() {
        assert!(pre_scan_allow_all_env_vars("catalog: {}\nallow_all_env_vars: true\n"));
        assert!(pre_scan_allow_all_env_vars("allow_all_env_vars: true # trusted host\n"));
        assert!(!pre_scan_allow_all_env_vars("  allow_all_env_vars: true\n"));
        assert!(!pre_scan_allow_all_env_vars("allow_all_env_vars: false\n"));
    }
}
