//! Short ID prefix resolution for CLI commands.
//!
//! Any unique prefix of a project UUID is accepted in place of the full id,
//! similar to git short hashes.

use anyhow::{bail, Result};
use sqlx::SqlitePool;
use std::fmt::Write;
use uuid::Uuid;

const PROJECT_QUERY: &str = "SELECT id FROM projects WHERE id LIKE ? ORDER BY created_at LIMIT 10";

/// Resolve a project ID prefix to a full UUID.
pub async fn resolve_project_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    // Full UUIDs skip the lookup so a missing project reports as not found.
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }

    let prefix = prefix.to_lowercase();
    validate_prefix(&prefix)?;

    let rows: Vec<(String,)> = sqlx::query_as(PROJECT_QUERY)
        .bind(format!("{prefix}%"))
        .fetch_all(pool)
        .await?;

    match rows.as_slice() {
        [] => bail!("No project found matching '{prefix}'"),
        [(id,)] => Ok(Uuid::parse_str(id)?),
        rows => {
            let mut msg = format!("Ambiguous prefix '{prefix}': matches several projects:");
            for (id,) in rows {
                let _ = write!(msg, "\n  {id}");
            }
            bail!(msg)
        }
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteProjectRepository};
    use crate::domain::models::Project;
    use crate::domain::ports::ProjectRepository;

    async fn store(pool: &SqlitePool, id: &str) -> Uuid {
        let repo = SqliteProjectRepository::new(pool.clone());
        let mut project = Project::new("https://github.com/a/b", "T", "L", "T_L_AI_Fix", 1);
        project.id = Uuid::parse_str(id).unwrap();
        repo.create(&project).await.unwrap();
        project.id
    }

    #[tokio::test]
    async fn test_resolves_unique_prefix() {
        let pool = create_migrated_test_pool().await.unwrap();
        let id = store(&pool, "abcdef01-0000-4000-8000-000000000001").await;
        store(&pool, "12345678-0000-4000-8000-000000000002").await;

        assert_eq!(resolve_project_id(&pool, "abcd").await.unwrap(), id);
        assert_eq!(resolve_project_id(&pool, "ABCDEF01").await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_ambiguous_and_missing_prefixes() {
        let pool = create_migrated_test_pool().await.unwrap();
        store(&pool, "abcdef01-0000-4000-8000-000000000001").await;
        store(&pool, "abcdef02-0000-4000-8000-000000000002").await;

        let err = resolve_project_id(&pool, "abcdef").await.unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));

        let err = resolve_project_id(&pool, "ffff").await.unwrap_err();
        assert!(err.to_string().contains("No project found"));
    }

    #[tokio::test]
    async fn test_rejects_non_hex_prefix() {
        let pool = create_migrated_test_pool().await.unwrap();
        let err = resolve_project_id(&pool, "xyz").await.unwrap_err();
        assert!(err.to_string().contains("Invalid ID prefix"));
    }

    #[tokio::test]
    async fn test_full_uuid_short_circuits() {
        let pool = create_migrated_test_pool().await.unwrap();
        let id = Uuid::new_v4();
        assert_eq!(resolve_project_id(&pool, &id.to_string()).await.unwrap(), id);
    }
}
