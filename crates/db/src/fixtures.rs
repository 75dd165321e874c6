use chrono::Utc;

use crate::connection::DbPool;
use crate::repositories::{encode_timestamp, new_id, RepositoryError};

/// Global jargon catalogue shipped with every install. Costs are in dollars.
pub const GLOBAL_JARGON_CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        term: "synergy",
        description: "The interaction of elements that when combined produce a total effect that is greater than the sum of the individual elements.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "low-hanging fruit",
        description: "A thing or person that can be won, obtained, or persuaded with little effort.",
        default_cost: "1.00",
    },
    CatalogueEntry {
        term: "circle back",
        description: "To return to a topic or discussion at a later time.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "leverage",
        description: "To use (something) to maximum advantage.",
        default_cost: "2.50",
    },
    CatalogueEntry {
        term: "touch base",
        description: "To briefly make or renew contact with someone.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "moving forward",
        description: "From now on; in the future.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "ideate",
        description: "To form an idea of; imagine or conceive.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "bandwidth",
        description: "The energy, mental capacity, or time that a person has available to deal with a situation.",
        default_cost: "2.00",
    },
    CatalogueEntry {
        term: "paradigm shift",
        description: "A fundamental change in approach or underlying assumptions.",
        default_cost: "5.00",
    },
    CatalogueEntry {
        term: "disrupt",
        description: "To drastically alter or destroy the structure of something.",
        default_cost: "1.50",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct CatalogueEntry {
    pub term: &'static str,
    pub description: &'static str,
    pub default_cost: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub already_present: usize,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Seeds and verifies the global (workspace-less) jargon terms.
pub struct GlobalCatalogue;

impl GlobalCatalogue {
    /// Inserts missing catalogue terms. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        let now = encode_timestamp(Utc::now());
        let mut inserted = 0;

        for entry in GLOBAL_JARGON_CATALOGUE {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO jargon_terms (
                    id, term, description, default_cost, created_by, workspace_id, created_at
                 ) VALUES (?, ?, ?, ?, NULL, NULL, ?)",
            )
            .bind(new_id())
            .bind(entry.term)
            .bind(entry.description)
            .bind(entry.default_cost)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(SeedResult { inserted, already_present: GLOBAL_JARGON_CATALOGUE.len() - inserted })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(GLOBAL_JARGON_CATALOGUE.len());

        for entry in GLOBAL_JARGON_CATALOGUE {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM jargon_terms
                    WHERE workspace_id IS NULL AND lower(term) = lower(?1)
                 )",
            )
            .bind(entry.term)
            .fetch_one(pool)
            .await?;
            checks.push((entry.term, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}
