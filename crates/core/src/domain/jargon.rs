use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::user::UserId;
use super::workspace::WorkspaceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JargonTermId(pub String);

/// A chargeable phrase. A `None` workspace makes the term global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JargonTerm {
    pub id: JargonTermId,
    pub term: String,
    pub description: Option<String>,
    pub default_cost: Decimal,
    pub created_by: Option<UserId>,
    pub workspace_id: Option<WorkspaceId>,
    pub created_at: DateTime<Utc>,
}

impl JargonTerm {
    pub fn is_global(&self) -> bool {
        self.workspace_id.is_none()
    }

    pub fn is_visible_to(&self, workspace_id: &WorkspaceId) -> bool {
        match &self.workspace_id {
            None => true,
            Some(owner) => owner == workspace_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewJargonTerm {
    pub term: String,
    pub description: Option<String>,
    pub default_cost: Decimal,
    pub created_by: Option<UserId>,
    pub workspace_id: Option<WorkspaceId>,
}

/// Trims a submitted term name, returning `None` when nothing is left.
pub fn normalize_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Case-insensitive equality used for duplicate detection.
pub fn same_term(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{normalize_term, same_term, JargonTerm, JargonTermId};
    use crate::domain::workspace::WorkspaceId;

    #[test]
    fn global_terms_are_visible_everywhere() {
        let mut term = JargonTerm {
            id: JargonTermId("t-1".to_string()),
            term: "synergy".to_string(),
            description: None,
            default_cost: Decimal::new(100, 2),
            created_by: None,
            workspace_id: None,
            created_at: Utc::now(),
        };
        let ws = WorkspaceId("ws-1".to_string());
        assert!(term.is_global());
        assert!(term.is_visible_to(&ws));

        term.workspace_id = Some(WorkspaceId("ws-2".to_string()));
        assert!(!term.is_visible_to(&ws));
    }

    #[test]
    fn term_names_compare_case_insensitively() {
        assert!(same_term("Circle Back", "circle back "));
        assert!(!same_term("circle back", "circle up"));
        assert_eq!(normalize_term("   "), None);
        assert_eq!(normalize_term(" Leverage "), Some("Leverage".to_string()));
    }
}
