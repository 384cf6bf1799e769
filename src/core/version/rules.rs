// ─── Rules ───
// Platform rules gating libraries and conditional arguments.

use regex::Regex;
use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Platform;

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    /// Launcher features (demo mode, custom resolution...) are never enabled.
    #[serde(default)]
    pub features: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    /// Regex matched against the OS version string.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Evaluate a rule list in order.
///
/// An `allow` rule whose conditions fail rejects immediately, as does a
/// `disallow` rule whose conditions pass. Falling off the end includes.
pub fn rules_allow(rules: &[Rule], platform: &Platform) -> LauncherResult<bool> {
    for rule in rules {
        let passed = conditions_pass(rule, platform)?;
        match rule.action {
            RuleAction::Allow if !passed => return Ok(false),
            RuleAction::Disallow if passed => return Ok(false),
            RuleAction::Allow | RuleAction::Disallow => {}
            RuleAction::Unknown => {
                return Err(LauncherError::Internal(
                    "Unexpected rule action in version file.".into(),
                ))
            }
        }
    }
    Ok(true)
}

fn conditions_pass(rule: &Rule, platform: &Platform) -> LauncherResult<bool> {
    if rule.features.is_some() {
        return Ok(false);
    }

    let Some(os) = &rule.os else {
        return Ok(true);
    };

    if let Some(name) = &os.name {
        if name != platform.os.rule_name() {
            return Ok(false);
        }
    }

    if let Some(pattern) = &os.version {
        let regex = Regex::new(pattern).map_err(|_| {
            LauncherError::VersionFile(format!("Value for rule os.version is not valid: {pattern}"))
        })?;
        if !regex.is_match(&platform.os_version) {
            return Ok(false);
        }
    }

    if let Some(arch) = &os.arch {
        let matches = match arch.as_str() {
            "x86" => !platform.is_64bit(),
            other => other == platform.arch.short_name(),
        };
        if !matches {
            return Ok(false);
        }
    }

    Ok(true)
}
