use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use jargon_jar_core::domain::charge::{
    Charge, ChargeId, NewCharge, TermUsageStats, UserChargeStats,
};
use jargon_jar_core::domain::jargon::{same_term, JargonTerm, JargonTermId, NewJargonTerm};
use jargon_jar_core::domain::user::{User, UserId, UserProfile};
use jargon_jar_core::domain::workspace::{Workspace, WorkspaceId, WorkspaceInstall};

use super::{
    new_id, ChargeRepository, JargonTermRepository, RepositoryError, UserRepository,
    WorkspaceRepository,
};

#[derive(Default)]
struct Tables {
    workspaces: HashMap<String, Workspace>,
    users: HashMap<String, User>,
    terms: HashMap<String, JargonTerm>,
    charges: Vec<Charge>,
}

/// All four tables behind one lock so leaderboard joins see a consistent view.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

fn sorted_by_term(mut terms: Vec<JargonTerm>) -> Vec<JargonTerm> {
    terms.sort_by(|left, right| {
        left.term.to_lowercase().cmp(&right.term.to_lowercase()).then(left.term.cmp(&right.term))
    });
    terms
}

#[async_trait::async_trait]
impl WorkspaceRepository for InMemoryStore {
    async fn find_by_id(&self, id: &WorkspaceId) -> Result<Option<Workspace>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.workspaces.get(&id.0).cloned())
    }

    async fn find_by_slack_id(
        &self,
        slack_id: &str,
    ) -> Result<Option<Workspace>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.workspaces.values().find(|workspace| workspace.slack_id == slack_id).cloned())
    }

    async fn upsert_install(
        &self,
        install: WorkspaceInstall,
    ) -> Result<Workspace, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) =
            tables.workspaces.values_mut().find(|workspace| workspace.slack_id == install.slack_id)
        {
            existing.name = install.name;
            existing.domain = install.domain;
            existing.bot_token = install.bot_token;
            existing.user_token = install.user_token;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let workspace = Workspace {
            id: WorkspaceId(new_id()),
            slack_id: install.slack_id,
            name: install.name,
            domain: install.domain,
            bot_token: install.bot_token,
            user_token: install.user_token,
            created_at: now,
            updated_at: now,
        };
        tables.workspaces.insert(workspace.id.0.clone(), workspace.clone());
        Ok(workspace)
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id.0).cloned())
    }

    async fn find_by_slack_id(
        &self,
        workspace_id: &WorkspaceId,
        slack_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.slack_id == slack_id && &user.workspace_id == workspace_id)
            .cloned())
    }

    async fn upsert(&self, profile: UserProfile) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.users.values_mut().find(|user| {
            user.slack_id == profile.slack_id && user.workspace_id == profile.workspace_id
        }) {
            if profile.email.is_some() {
                existing.email = profile.email;
            }
            if profile.avatar_url.is_some() {
                existing.avatar_url = profile.avatar_url;
            }
            existing.display_name = profile.display_name;
            return Ok(existing.clone());
        }

        let user = User {
            id: UserId(new_id()),
            slack_id: profile.slack_id,
            email: profile.email,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            workspace_id: profile.workspace_id,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id.0.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl JargonTermRepository for InMemoryStore {
    async fn find_by_id(&self, id: &JargonTermId) -> Result<Option<JargonTerm>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.terms.get(&id.0).cloned())
    }

    async fn list_visible(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<JargonTerm>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(sorted_by_term(
            tables.terms.values().filter(|term| term.is_visible_to(workspace_id)).cloned().collect(),
        ))
    }

    async fn search_visible(
        &self,
        workspace_id: &WorkspaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<JargonTerm>, RepositoryError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        let matches = tables
            .terms
            .values()
            .filter(|term| {
                term.is_visible_to(workspace_id) && term.term.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();

        Ok(sorted_by_term(matches).into_iter().take(limit as usize).collect())
    }

    async fn find_visible_by_name(
        &self,
        workspace_id: &WorkspaceId,
        term: &str,
    ) -> Result<Option<JargonTerm>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<_> = tables
            .terms
            .values()
            .filter(|candidate| {
                candidate.is_visible_to(workspace_id) && same_term(&candidate.term, term)
            })
            .cloned()
            .collect();
        matches.sort_by_key(JargonTerm::is_global);
        Ok(matches.into_iter().next())
    }

    async fn insert(&self, term: NewJargonTerm) -> Result<JargonTerm, RepositoryError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.terms.values().any(|existing| {
            existing.workspace_id == term.workspace_id && same_term(&existing.term, &term.term)
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "jargon term `{}` already exists",
                term.term.trim()
            )));
        }

        let created = JargonTerm {
            id: JargonTermId(new_id()),
            term: term.term.trim().to_string(),
            description: term.description,
            default_cost: term.default_cost,
            created_by: term.created_by,
            workspace_id: term.workspace_id,
            created_at: Utc::now(),
        };
        tables.terms.insert(created.id.0.clone(), created.clone());
        Ok(created)
    }
}

#[async_trait::async_trait]
impl ChargeRepository for InMemoryStore {
    async fn insert(&self, charge: NewCharge) -> Result<Charge, RepositoryError> {
        let created = Charge {
            id: ChargeId(new_id()),
            charging_user_id: charge.charging_user_id,
            charged_user_id: charge.charged_user_id,
            jargon_term_id: charge.jargon_term_id,
            amount: charge.amount,
            channel_id: charge.channel_id,
            workspace_id: charge.workspace_id,
            is_automatic: charge.is_automatic,
            message_text: charge.message_text,
            message_ts: charge.message_ts,
            created_at: Utc::now(),
        };
        self.tables.write().await.charges.push(created.clone());
        Ok(created)
    }

    async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Charge>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .charges
            .iter()
            .rev()
            .filter(|charge| &charge.workspace_id == workspace_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn top_charged_users(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<UserChargeStats>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut totals: HashMap<&str, (i64, Decimal)> = HashMap::new();
        for charge in tables.charges.iter().filter(|charge| &charge.workspace_id == workspace_id) {
            let entry = totals.entry(charge.charged_user_id.0.as_str()).or_default();
            entry.0 += 1;
            entry.1 += charge.amount;
        }

        let mut stats: Vec<UserChargeStats> = totals
            .into_iter()
            .filter_map(|(user_id, (charge_count, total_amount))| {
                tables.users.get(user_id).map(|user| UserChargeStats {
                    user_id: user.id.clone(),
                    display_name: user.display_name.clone(),
                    avatar_url: user.avatar_url.clone(),
                    charge_count,
                    total_amount,
                })
            })
            .collect();
        stats.sort_by(|left, right| {
            right.charge_count.cmp(&left.charge_count).then(left.display_name.cmp(&right.display_name))
        });
        stats.truncate(limit as usize);
        Ok(stats)
    }

    async fn top_terms(
        &self,
        workspace_id: &WorkspaceId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<TermUsageStats>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut totals: HashMap<&str, (i64, Decimal)> = HashMap::new();
        let in_window = |charge: &&Charge| {
            &charge.workspace_id == workspace_id
                && since.map(|bound| charge.created_at >= bound).unwrap_or(true)
        };
        for charge in tables.charges.iter().filter(in_window) {
            let entry = totals.entry(charge.jargon_term_id.0.as_str()).or_default();
            entry.0 += 1;
            entry.1 += charge.amount;
        }

        let mut stats: Vec<TermUsageStats> = totals
            .into_iter()
            .filter_map(|(term_id, (usage_count, total_amount))| {
                tables.terms.get(term_id).map(|term| TermUsageStats {
                    term_id: term.id.clone(),
                    term: term.term.clone(),
                    description: term.description.clone(),
                    usage_count,
                    total_amount,
                })
            })
            .collect();
        stats.sort_by_key(|stat| (Reverse(stat.usage_count), stat.term.to_lowercase()));
        stats.truncate(limit as usize);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use jargon_jar_core::domain::charge::NewCharge;
    use jargon_jar_core::domain::jargon::NewJargonTerm;
    use jargon_jar_core::domain::user::UserProfile;
    use jargon_jar_core::domain::workspace::{WorkspaceId, WorkspaceInstall};

    use crate::repositories::{Repositories, RepositoryError};

    async fn seeded() -> (Repositories, WorkspaceId) {
        let repos = Repositories::in_memory();
        let workspace = repos
            .workspaces
            .upsert_install(WorkspaceInstall {
                slack_id: "T0001".to_string(),
                name: "Acme".to_string(),
                domain: None,
                bot_token: SecretString::from("xoxb-test".to_string()),
                user_token: None,
            })
            .await
            .expect("install");
        (repos, workspace.id)
    }

    #[tokio::test]
    async fn in_memory_user_upsert_is_keyed_on_slack_id_and_workspace() {
        let (repos, workspace_id) = seeded().await;
        let profile = UserProfile {
            slack_id: "U0001".to_string(),
            email: Some("a@example.com".to_string()),
            display_name: "alice".to_string(),
            avatar_url: None,
            workspace_id: workspace_id.clone(),
        };

        let first = repos.users.upsert(profile.clone()).await.expect("first");
        let second = repos
            .users
            .upsert(UserProfile { email: None, display_name: "Alice".to_string(), ..profile })
            .await
            .expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(second.email.as_deref(), Some("a@example.com"));
        assert_eq!(second.display_name, "Alice");
    }

    #[tokio::test]
    async fn in_memory_terms_match_sql_visibility_rules() {
        let (repos, workspace_id) = seeded().await;
        for (term, scope) in [
            ("synergy", None),
            ("Bandwidth", Some(workspace_id.clone())),
            ("ideate", Some(WorkspaceId("ws-other".to_string()))),
        ] {
            repos
                .jargon_terms
                .insert(NewJargonTerm {
                    term: term.to_string(),
                    description: None,
                    default_cost: Decimal::new(1, 0),
                    created_by: None,
                    workspace_id: scope,
                })
                .await
                .expect("insert");
        }

        let visible = repos.jargon_terms.list_visible(&workspace_id).await.expect("list");
        let names: Vec<_> = visible.iter().map(|term| term.term.as_str()).collect();
        assert_eq!(names, vec!["Bandwidth", "synergy"]);

        let duplicate = repos
            .jargon_terms
            .insert(NewJargonTerm {
                term: " SYNERGY ".to_string(),
                description: None,
                default_cost: Decimal::new(1, 0),
                created_by: None,
                workspace_id: None,
            })
            .await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn in_memory_leaderboard_ranks_by_count() {
        let (repos, workspace_id) = seeded().await;
        let mut users = Vec::new();
        for (slack_id, name) in [("U1", "alice"), ("U2", "bob")] {
            users.push(
                repos
                    .users
                    .upsert(UserProfile {
                        slack_id: slack_id.to_string(),
                        email: None,
                        display_name: name.to_string(),
                        avatar_url: None,
                        workspace_id: workspace_id.clone(),
                    })
                    .await
                    .expect("user"),
            );
        }
        let term = repos
            .jargon_terms
            .insert(NewJargonTerm {
                term: "leverage".to_string(),
                description: None,
                default_cost: Decimal::new(2, 0),
                created_by: None,
                workspace_id: None,
            })
            .await
            .expect("term");

        for charged in [&users[1], &users[1], &users[0]] {
            repos
                .charges
                .insert(NewCharge {
                    charging_user_id: users[0].id.clone(),
                    charged_user_id: charged.id.clone(),
                    jargon_term_id: term.id.clone(),
                    amount: Decimal::new(2, 0),
                    channel_id: "C1".to_string(),
                    workspace_id: workspace_id.clone(),
                    is_automatic: false,
                    message_text: None,
                    message_ts: None,
                })
                .await
                .expect("charge");
        }

        let top = repos.charges.top_charged_users(&workspace_id, 10).await.expect("top");
        assert_eq!(top[0].display_name, "bob");
        assert_eq!(top[0].total_amount, Decimal::new(4, 0));

        let terms = repos.charges.top_terms(&workspace_id, None, 10).await.expect("terms");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].usage_count, 3);
    }
}
