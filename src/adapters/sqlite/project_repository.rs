//! SQLite implementation of the ProjectRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{format_datetime, parse_count, parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Project, ProjectStatus, RunSummary, Timeline};
use crate::domain::ports::{ProjectFilter, ProjectRepository};

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

/// `LIKE` pattern matching `raw` anywhere, with wildcards in `raw` escaped by `\`.
fn contains_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, project: &Project) -> DomainResult<()> {
        let timeline_json = serde_json::to_string(&project.timeline)?;
        let summary_json = project.summary.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"INSERT INTO projects (id, repo_url, team_name, leader_name, branch_name, status,
               retry_count, max_retries, commit_count, timeline, summary, score, failure_reason,
               version, created_at, updated_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(project.id.to_string())
        .bind(&project.repo_url)
        .bind(&project.team_name)
        .bind(&project.leader_name)
        .bind(&project.branch_name)
        .bind(project.status.as_str())
        .bind(i64::from(project.retry_count))
        .bind(i64::from(project.max_retries))
        .bind(i64::from(project.commit_count))
        .bind(&timeline_json)
        .bind(&summary_json)
        .bind(project.score.map(i64::from))
        .bind(&project.failure_reason)
        .bind(i64::try_from(project.version).unwrap_or(i64::MAX))
        .bind(format_datetime(&project.created_at))
        .bind(format_datetime(&project.updated_at))
        .bind(project.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Project::try_from).transpose()
    }

    async fn update(&self, project: &Project) -> DomainResult<u64> {
        let timeline_json = serde_json::to_string(&project.timeline)?;
        let summary_json = project.summary.as_ref().map(serde_json::to_string).transpose()?;
        let version = i64::try_from(project.version).unwrap_or(i64::MAX);

        let result = sqlx::query(
            r#"UPDATE projects SET status = ?, retry_count = ?, max_retries = ?, commit_count = ?,
               timeline = ?, summary = ?, score = ?, failure_reason = ?,
               updated_at = ?, completed_at = ?, version = version + 1
               WHERE id = ? AND version = ?"#,
        )
        .bind(project.status.as_str())
        .bind(i64::from(project.retry_count))
        .bind(i64::from(project.max_retries))
        .bind(i64::from(project.commit_count))
        .bind(&timeline_json)
        .bind(&summary_json)
        .bind(project.score.map(i64::from))
        .bind(&project.failure_reason)
        .bind(format_datetime(&project.updated_at))
        .bind(project.completed_at.as_ref().map(format_datetime))
        .bind(project.id.to_string())
        .bind(version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.exists(project.id).await? {
                return Err(DomainError::ConcurrencyConflict {
                    entity: "project".to_string(),
                    id: project.id.to_string(),
                });
            }
            return Err(DomainError::ProjectNotFound(project.id));
        }

        Ok(project.version + 1)
    }

    async fn list(&self, filter: ProjectFilter) -> DomainResult<Vec<Project>> {
        let mut query = String::from("SELECT * FROM projects WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(team) = &filter.team_name {
            query.push_str(" AND team_name LIKE ? ESCAPE '\\'");
            bindings.push(contains_pattern(team));
        }
        if let Some(repo_url) = &filter.repo_url {
            query.push_str(" AND repo_url = ?");
            bindings.push(repo_url.clone());
        }

        query.push_str(" ORDER BY created_at ASC, rowid ASC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit.max(0)));
        }

        let mut q = sqlx::query_as::<_, ProjectRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<ProjectRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Project::try_from).collect()
    }

    async fn list_stale(&self, updated_before: DateTime<Utc>) -> DomainResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"SELECT * FROM projects
               WHERE status IN ('pending', 'running') AND updated_at < ?
               ORDER BY updated_at ASC, rowid ASC"#,
        )
        .bind(format_datetime(&updated_before))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Project::try_from).collect()
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let at = format_datetime(&at);
        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ? AND updated_at < ?")
            .bind(&at)
            .bind(id.to_string())
            .bind(&at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_by_status(&self) -> DomainResult<HashMap<ProjectStatus, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM projects GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = ProjectStatus::from_str(&status_str) {
                counts.insert(status, parse_count("count", count)?);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    repo_url: String,
    team_name: String,
    leader_name: String,
    branch_name: String,
    status: String,
    retry_count: i64,
    max_retries: i64,
    commit_count: i64,
    timeline: String,
    summary: Option<String>,
    score: Option<i64>,
    failure_reason: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = DomainError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status = ProjectStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid status: {}", row.status))
        })?;
        let timeline: Timeline = serde_json::from_str(&row.timeline)?;
        let summary: Option<RunSummary> = row
            .summary
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Project {
            id: parse_uuid(&row.id)?,
            repo_url: row.repo_url,
            team_name: row.team_name,
            leader_name: row.leader_name,
            branch_name: row.branch_name,
            status,
            retry_count: parse_count("retry_count", row.retry_count)?,
            max_retries: parse_count("max_retries", row.max_retries)?,
            commit_count: parse_count("commit_count", row.commit_count)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
            timeline,
            summary,
            score: row.score.map(|s| parse_count("score", s)).transpose()?,
            failure_reason: row.failure_reason,
            version: parse_count("version", row.version)?,
        })
    }
}
