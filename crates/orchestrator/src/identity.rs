//! Mapping of logical names to isolated stacks

use crate::error::{OrchestratorError, Result};
use std::fmt;

/// Longest accepted logical name
pub const MAX_NAME_LEN: usize = 63;

/// A logical name bound to its project
///
/// Names are trimmed and lowercased before use, so `"Alpha"` and
/// `" alpha "` address the same stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackIdentity {
    project: String,
    logical: String,
}

impl StackIdentity {
    pub fn new(project: &str, name: &str) -> Result<Self> {
        let logical = name.trim().to_ascii_lowercase();
        if logical.is_empty() {
            return Err(OrchestratorError::validation("name must not be empty"));
        }
        if logical.len() > MAX_NAME_LEN {
            return Err(OrchestratorError::validation(format!(
                "name '{logical}' is longer than {MAX_NAME_LEN} characters"
            )));
        }
        if let Some(bad) = logical.chars().find(|c| !is_name_char(*c)) {
            return Err(OrchestratorError::validation(format!(
                "name '{logical}' contains '{bad}'; use letters, digits, '-', '_' or '.'"
            )));
        }
        if logical.starts_with('.') {
            return Err(OrchestratorError::validation(format!(
                "name '{logical}' must not start with '.'"
            )));
        }

        Ok(Self {
            project: project.to_string(),
            logical,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Normalized logical name
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Stack name: `<project>.<logical>`
    pub fn stack_name(&self) -> String {
        format!("{}.{}", self.project, self.logical)
    }
}

impl fmt::Display for StackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.logical)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_names_are_normalized() {
        let a = StackIdentity::new("site", "Alpha").unwrap();
        let b = StackIdentity::new("site", "  alpha\n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.stack_name(), "site.alpha");
        assert_eq!(a.to_string(), "site.alpha");
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["", "   ", "a b", "a/b", "../up", ".hidden", "ünï"] {
            let err = StackIdentity::new("site", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(StackIdentity::new("site", &long).is_err());
        assert!(StackIdentity::new("site", &long[1..]).is_ok());
    }

    #[test]
    fn test_allowed_punctuation() {
        let id = StackIdentity::new("site", "pr-12_v1.2").unwrap();
        assert_eq!(id.logical(), "pr-12_v1.2");
    }
}
