//! SQLite implementation of the BugRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{format_datetime, parse_count, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Bug, BugStatus, BugType};
use crate::domain::ports::{BugRepository, BugWrite};

#[derive(Clone)]
pub struct SqliteBugRepository {
    pool: SqlitePool,
}

impl SqliteBugRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BugRepository for SqliteBugRepository {
    async fn record(&self, bug: &Bug) -> DomainResult<BugWrite> {
        let Some(existing) = self.get(bug.id).await? else {
            sqlx::query(
                r#"INSERT INTO bugs (id, project_id, file_path, bug_type, line_number,
                   error_message, fix_applied, status, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(bug.id.to_string())
            .bind(bug.project_id.to_string())
            .bind(&bug.file_path)
            .bind(bug.bug_type.as_str())
            .bind(i64::from(bug.line_number))
            .bind(&bug.error_message)
            .bind(&bug.fix_applied)
            .bind(bug.status.as_str())
            .bind(format_datetime(&bug.created_at))
            .execute(&self.pool)
            .await?;
            return Ok(BugWrite::Inserted);
        };

        if existing.project_id != bug.project_id {
            return Err(DomainError::Conflict(format!(
                "bug {} belongs to project {}",
                bug.id, existing.project_id
            )));
        }

        if existing.status == BugStatus::Pending && bug.status.is_terminal() {
            sqlx::query("UPDATE bugs SET status = ?, fix_applied = COALESCE(?, fix_applied) WHERE id = ? AND status = 'pending'")
                .bind(bug.status.as_str())
                .bind(&bug.fix_applied)
                .bind(bug.id.to_string())
                .execute(&self.pool)
                .await?;
            return Ok(BugWrite::StatusUpdated);
        }

        Ok(BugWrite::Unchanged)
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Bug>> {
        let row: Option<BugRow> = sqlx::query_as("SELECT * FROM bugs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bug::try_from).transpose()
    }

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Bug>> {
        let rows: Vec<BugRow> = sqlx::query_as(
            "SELECT * FROM bugs WHERE project_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bug::try_from).collect()
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<BugStatus, u64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM bugs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = BugStatus::from_str(&status_str) {
                counts.insert(status, parse_count("count", count)?);
            }
        }
        Ok(counts)
    }

    async fn count_by_type(&self) -> DomainResult<HashMap<BugType, u64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT bug_type, COUNT(*) FROM bugs GROUP BY bug_type")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for (type_str, count) in rows {
            if let Some(bug_type) = BugType::from_str(&type_str) {
                counts.insert(bug_type, parse_count("count", count)?);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct BugRow {
    id: String,
    project_id: String,
    file_path: String,
    bug_type: String,
    line_number: i64,
    error_message: String,
    fix_applied: Option<String>,
    status: String,
    created_at: String,
}

impl TryFrom<BugRow> for Bug {
    type Error = DomainError;

    fn try_from(row: BugRow) -> Result<Self, Self::Error> {
        let bug_type = BugType::from_str(&row.bug_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid bug type: {}", row.bug_type))
        })?;
        let status = BugStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid bug status: {}", row.status))
        })?;

        Ok(Bug {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            file_path: row.file_path,
            bug_type,
            line_number: parse_count("line_number", row.line_number)?,
            error_message: row.error_message,
            fix_applied: row.fix_applied,
            status,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteProjectRepository};
    use crate::domain::models::Project;
    use crate::domain::ports::ProjectRepository;

    async fn setup() -> (SqliteBugRepository, Uuid, Uuid) {
        let pool = create_migrated_test_pool().await.unwrap();
        let projects = SqliteProjectRepository::new(pool.clone());
        let a = Project::new("https://github.com/a/b", "A", "L", "A_L_AI_Fix", 5);
        let b = Project::new("https://github.com/c/d", "B", "L", "B_L_AI_Fix", 5);
        projects.create(&a).await.unwrap();
        projects.create(&b).await.unwrap();
        (SqliteBugRepository::new(pool), a.id, b.id)
    }

    #[tokio::test]
    async fn test_record_is_idempotent_by_id() {
        let (repo, project_id, _) = setup().await;
        let bug = Bug::new(project_id, "src/app.py", BugType::Syntax, 3, "missing colon");

        assert_eq!(repo.record(&bug).await.unwrap(), BugWrite::Inserted);
        assert_eq!(repo.record(&bug).await.unwrap(), BugWrite::Unchanged);
        assert_eq!(repo.list_by_project(project_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_bug_moves_to_terminal_only() {
        let (repo, project_id, _) = setup().await;
        let bug = Bug::new(project_id, "src/app.py", BugType::Logic, 8, "off by one");
        repo.record(&bug).await.unwrap();

        let fixed = bug.clone().with_fix("use <=");
        assert_eq!(repo.record(&fixed).await.unwrap(), BugWrite::StatusUpdated);

        let reverted = bug.clone().with_status(BugStatus::Failed);
        assert_eq!(repo.record(&reverted).await.unwrap(), BugWrite::Unchanged);

        let stored = repo.get(bug.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BugStatus::Fixed);
        assert_eq!(stored.fix_applied.as_deref(), Some("use <="));
    }

    #[tokio::test]
    async fn test_bug_cannot_move_between_projects() {
        let (repo, first, second) = setup().await;
        let bug = Bug::new(first, "lib.py", BugType::Import, 1, "unused import");
        repo.record(&bug).await.unwrap();

        let mut moved = bug.clone();
        moved.project_id = second;
        assert!(matches!(
            repo.record(&moved).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_counts() {
        let (repo, project_id, other) = setup().await;
        repo.record(&Bug::new(project_id, "a.py", BugType::Linting, 1, "x").with_fix("y"))
            .await
            .unwrap();
        repo.record(&Bug::new(project_id, "b.py", BugType::Linting, 2, "x"))
            .await
            .unwrap();
        repo.record(&Bug::new(other, "c.py", BugType::Indentation, 3, "x"))
            .await
            .unwrap();

        let by_type = repo.count_by_type().await.unwrap();
        assert_eq!(by_type.get(&BugType::Linting), Some(&2));
        assert_eq!(by_type.get(&BugType::Indentation), Some(&1));

        let by_status = repo.count_by_status().await.unwrap();
        assert_eq!(by_status.get(&BugStatus::Fixed), Some(&1));
        assert_eq!(by_status.get(&BugStatus::Pending), Some(&2));
    }
}
