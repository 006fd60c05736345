//! Canonical branch names derived from team and leader names.

use crate::domain::errors::{DomainError, DomainResult};

const SUFFIX: &str = "AI_Fix";

/// Builds `{TEAM}_{LEADER}_AI_Fix` branch names.
pub struct BranchNameGenerator;

impl BranchNameGenerator {
    /// Uppercase, collapse whitespace runs to `_`, drop anything outside `[A-Z0-9_]`.
    pub fn normalize(input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut in_whitespace = false;

        for c in input.trim().to_uppercase().chars() {
            if c.is_whitespace() {
                if !in_whitespace {
                    out.push('_');
                }
                in_whitespace = true;
                continue;
            }
            in_whitespace = false;
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' {
                out.push(c);
            }
        }
        out
    }

    /// Generate the branch name, failing if either part normalizes to nothing.
    ///
    /// A part made only of underscores counts as empty.
    pub fn generate(team_name: &str, leader_name: &str) -> DomainResult<String> {
        let team = Self::normalized_part("team_name", team_name)?;
        let leader = Self::normalized_part("leader_name", leader_name)?;
        Ok(format!("{team}_{leader}_{SUFFIX}"))
    }

    fn normalized_part(field: &str, raw: &str) -> DomainResult<String> {
        let part = Self::normalize(raw);
        if part.chars().all(|c| c == '_') {
            return Err(DomainError::validation(
                field,
                format!("'{raw}' has no letters or digits to build a branch name from"),
            ));
        }
        Ok(part)
    }
}
