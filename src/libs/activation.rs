//! Activation script composition.
//!
//! The activation script is a plain shell fragment assembled from a template
//! containing `<NAME>` tokens. Toolbox-wide values are applied first, then
//! each installer's contribution in registration order. Two rules are
//! enforced here rather than trusted by convention:
//!
//! - no two contributors may claim the same placeholder name (a silent
//!   overwrite between adapters is a bug, so it fails the run instead), and
//! - after composition, zero `<...>` tokens may remain anywhere in the text;
//!   a partially-resolved script is never written.
//!
//! The composer is a two-state machine: everything happens on the
//! unvalidated text, and `write()` — validate, then persist — is terminal.

use crate::errors::ToolboxError;
use crate::log_debug;
use colored::Colorize;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A named `<NAME>` token in the activation template. Adapters declare
/// these as constants so the composition surface of each tool is visible in
/// one place per adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placeholder(pub &'static str);

impl Placeholder {
    fn token(&self) -> String {
        format!("<{}>", self.0)
    }
}

/// Sentinel convention for `_ENABLED` placeholders: the template keys its
/// conditional blocks on `[ -n "<X_ENABLED>" ]`, so "true" turns a block on
/// and the empty string turns it off.
pub fn enabled_flag(enabled: bool) -> String {
    if enabled { "true".to_string() } else { String::new() }
}

pub struct ActivationScript {
    text: String,
    /// placeholder name -> contributor that claimed it, for collision reports.
    claimed: HashMap<&'static str, &'static str>,
}

impl ActivationScript {
    pub fn from_template(text: String) -> Self {
        ActivationScript {
            text,
            claimed: HashMap::new(),
        }
    }

    /// Substitutes one contributor's replacements, rejecting any placeholder
    /// already claimed by a different contributor.
    pub fn apply(
        &mut self,
        contributor: &'static str,
        replacements: &[(Placeholder, String)],
    ) -> Result<(), ToolboxError> {
        for (placeholder, value) in replacements {
            if let Some(owner) = self.claimed.get(placeholder.0) {
                return Err(ToolboxError::Template(format!(
                    "placeholder <{}> claimed by both '{}' and '{}'",
                    placeholder.0, owner, contributor
                )));
            }
            self.claimed.insert(placeholder.0, contributor);
            log_debug!(
                "activate: {} <- {:?} (from {})",
                placeholder.token().cyan(),
                value,
                contributor
            );
            self.text = self.text.replace(&placeholder.token(), value);
        }
        Ok(())
    }

    /// Scans every line for leftover `<...>` tokens. Any hit means some
    /// adapter failed to contribute its full placeholder set.
    pub fn validate(&self) -> Result<(), ToolboxError> {
        let token_re = Regex::new(r"<[^<>]*>").expect("placeholder regex is valid");
        let mut leftovers = Vec::new();
        for (idx, line) in self.text.lines().enumerate() {
            if token_re.is_match(line) {
                leftovers.push(format!("line {}: {}", idx + 1, line.trim()));
            }
        }
        if leftovers.is_empty() {
            return Ok(());
        }
        Err(ToolboxError::Template(format!(
            "unresolved placeholders in activation script:\n\t{}",
            leftovers.join("\n\t")
        )))
    }

    /// Validates and writes the final script. Consumes the composer: once
    /// written, the script is done for this run.
    pub fn write(self, dest: &Path) -> Result<(), ToolboxError> {
        self.validate()?;
        fs::write(dest, &self.text).map_err(|e| {
            ToolboxError::Template(format!("cannot write {}: {e}", dest.display()))
        })?;
        log_debug!("Activation script written to {}", dest.display().to_string().green());
        Ok(())
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const A: Placeholder = Placeholder("A");
    const B: Placeholder = Placeholder("B");

    #[test]
    fn full_replacement_map_leaves_no_tokens() {
        let mut script = ActivationScript::from_template("x=<A>\ny=<B>\n".to_string());
        script
            .apply("test", &[(A, "1".to_string()), (B, "2".to_string())])
            .unwrap();
        script.validate().unwrap();
        assert_eq!(script.text(), "x=1\ny=2\n");
    }

    #[test]
    fn missing_replacement_fails_naming_the_line() {
        let mut script = ActivationScript::from_template("x=<A>\ny=<B>\n".to_string());
        script.apply("test", &[(A, "1".to_string())]).unwrap();
        let err = script.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 2"));
        assert!(message.contains("<B>"));
    }

    #[test]
    fn empty_replacement_value_still_resolves_the_token() {
        let mut script =
            ActivationScript::from_template("if [ -n \"<A>\" ] ; then :; fi\n".to_string());
        script.apply("test", &[(A, String::new())]).unwrap();
        script.validate().unwrap();
        assert_eq!(script.text(), "if [ -n \"\" ] ; then :; fi\n");
    }

    #[test]
    fn repeated_token_is_replaced_everywhere() {
        let mut script = ActivationScript::from_template("<A> and <A>\n".to_string());
        script.apply("test", &[(A, "x".to_string())]).unwrap();
        assert_eq!(script.text(), "x and x\n");
    }

    #[test]
    fn two_contributors_claiming_one_key_collide() {
        let mut script = ActivationScript::from_template("<A>\n".to_string());
        script.apply("first", &[(A, "1".to_string())]).unwrap();
        let err = script.apply("second", &[(A, "2".to_string())]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
        assert!(message.contains("<A>"));
    }

    #[test]
    fn shell_redirections_do_not_trip_validation() {
        let script = ActivationScript::from_template(
            "unalias t 2> /dev/null\necho done > /tmp/x\n".to_string(),
        );
        script.validate().unwrap();
    }

    #[test]
    fn write_refuses_a_partially_resolved_script() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("activate");
        let script = ActivationScript::from_template("x=<A>\n".to_string());
        assert!(script.write(&dest).is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn write_persists_a_fully_resolved_script() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("activate");
        let mut script = ActivationScript::from_template("x=<A>\n".to_string());
        script.apply("test", &[(A, "1".to_string())]).unwrap();
        script.write(&dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "x=1\n");
    }
}
