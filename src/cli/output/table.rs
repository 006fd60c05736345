//! Table output formatting for CLI commands
//!
//! Renders projects, timelines and bugs with comfy-table. Status cells are
//! colour-coded unless colour is disabled, in which case an icon prefix
//! carries the same information.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::{format_duration_secs, short_id, truncate};
use crate::domain::models::{Bug, BugStatus, Project, ProjectStatus, TimelineEntry, TimelineStatus};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    pub fn format_projects(&self, projects: &[Project]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Team", "Leader", "Status", "Attempt", "Score", "Branch"]));

        for project in projects {
            let score = project
                .score
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            table.add_row(vec![
                Cell::new(short_id(&project.id)),
                Cell::new(truncate(&project.team_name, 20)),
                Cell::new(truncate(&project.leader_name, 20)),
                self.project_status_cell(project.status),
                Cell::new(format!("{}/{}", project.current_attempt(), project.max_retries + 1)),
                Cell::new(score),
                Cell::new(truncate(&project.branch_name, 40)),
            ]);
        }

        table.to_string()
    }

    pub fn format_timeline(&self, entries: &[TimelineEntry]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Attempt", "Status", "Started", "Duration", "Error"]));

        for entry in entries {
            let started = entry
                .started_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
            let duration = entry.duration_ms.map_or_else(
                || "-".to_string(),
                |ms| format_duration_secs(i64::try_from(ms / 1000).unwrap_or(i64::MAX)),
            );
            table.add_row(vec![
                Cell::new(entry.attempt),
                self.timeline_status_cell(entry.status),
                Cell::new(started),
                Cell::new(duration),
                Cell::new(entry.error.as_deref().map_or_else(|| "-".to_string(), |e| truncate(e, 60))),
            ]);
        }

        table.to_string()
    }

    pub fn format_bugs(&self, bugs: &[Bug]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["File", "Line", "Type", "Status", "Error", "Fix"]));

        for bug in bugs {
            table.add_row(vec![
                Cell::new(truncate(&bug.file_path, 40)),
                Cell::new(bug.line_number),
                Cell::new(bug.bug_type.as_str()),
                self.bug_status_cell(bug.status),
                Cell::new(truncate(&bug.error_message, 50)),
                Cell::new(bug.fix_applied.as_deref().map_or_else(|| "-".to_string(), |f| truncate(f, 40))),
            ]);
        }

        table.to_string()
    }

    fn project_status_cell(&self, status: ProjectStatus) -> Cell {
        let (color, icon) = match status {
            ProjectStatus::Pending => (Color::Yellow, "⧗"),
            ProjectStatus::Running => (Color::Cyan, "⟳"),
            ProjectStatus::Completed => (Color::Green, "✓"),
            ProjectStatus::Failed => (Color::Red, "✗"),
        };
        self.status_cell(status.as_str(), color, icon)
    }

    fn timeline_status_cell(&self, status: TimelineStatus) -> Cell {
        let (color, icon) = match status {
            TimelineStatus::Pending => (Color::Yellow, "⧗"),
            TimelineStatus::Running => (Color::Cyan, "⟳"),
            TimelineStatus::Success => (Color::Green, "✓"),
            TimelineStatus::Failed => (Color::Red, "✗"),
        };
        self.status_cell(status.as_str(), color, icon)
    }

    fn bug_status_cell(&self, status: BugStatus) -> Cell {
        let (color, icon) = match status {
            BugStatus::Fixed => (Color::Green, "✓"),
            BugStatus::Pending => (Color::Yellow, "⧗"),
            BugStatus::Failed => (Color::Red, "✗"),
        };
        self.status_cell(status.as_str(), color, icon)
    }

    fn status_cell(&self, label: &str, color: Color, icon: &str) -> Cell {
        if self.use_colors {
            Cell::new(label).fg(color)
        } else {
            Cell::new(format!("{icon} {label}"))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}
