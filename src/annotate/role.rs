use std::fmt;

use serde::Serialize;

/// Author of a turn container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// No role marker rendered yet.
    Unknown,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Unknown => "unknown",
        }
    }

    /// Resolve from the presence of each marker. The user marker wins when both are present.
    pub const fn from_markers(has_user: bool, has_assistant: bool) -> Self {
        match (has_user, has_assistant) {
            (true, _) => Self::User,
            (false, true) => Self::Assistant,
            (false, false) => Self::Unknown,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_markers() {
        assert_eq!(Role::from_markers(true, false), Role::User);
        assert_eq!(Role::from_markers(false, true), Role::Assistant);
        assert_eq!(Role::from_markers(false, false), Role::Unknown);
        // Both present: user wins
        assert_eq!(Role::from_markers(true, true), Role::User);
    }

    #[test]
    fn test_display_matches_json() {
        for role in [Role::User, Role::Assistant, Role::Unknown] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }
}
