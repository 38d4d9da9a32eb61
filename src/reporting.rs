use std::fmt::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ResponseRow, ResponseStatus, ThresholdConfig, UserStats};
use crate::threshold::{self, Category};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(ResponseStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionnaireFilter {
    All,
    Only(Uuid),
}

#[derive(Debug, Clone)]
pub struct ResponseFilter {
    pub search: String,
    pub status: StatusFilter,
    pub questionnaire: QuestionnaireFilter,
}

impl Default for ResponseFilter {
    fn default() -> Self {
        ResponseFilter {
            search: String::new(),
            status: StatusFilter::All,
            questionnaire: QuestionnaireFilter::All,
        }
    }
}

/// Applies search, status, and questionnaire filters conjunctively.
///
/// The search term matches case-insensitively as a substring of the username
/// or email; an empty term matches everything. Relative input order is kept.
pub fn filter_responses(rows: &[ResponseRow], filter: &ResponseFilter) -> Vec<ResponseRow> {
    let needle = filter.search.to_lowercase();

    rows.iter()
        .filter(|row| {
            let matches_search = needle.is_empty()
                || row.username.to_lowercase().contains(&needle)
                || row.email.to_lowercase().contains(&needle);
            let matches_status = match filter.status {
                StatusFilter::All => true,
                StatusFilter::Only(status) => row.status == status,
            };
            let matches_questionnaire = match filter.questionnaire {
                QuestionnaireFilter::All => true,
                QuestionnaireFilter::Only(id) => row.questionnaire_id == id,
            };
            matches_search && matches_status && matches_questionnaire
        })
        .cloned()
        .collect()
}

/// Pure slice of one page out of an already-filtered list.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return &[];
    }
    let start = page.saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Pagination state for a table view. Changing the page size jumps back to the
/// first page so the visible slice can never be out of range.
#[derive(Debug, Clone, Copy)]
pub struct Pager {
    pub page: usize,
    pub page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Pager { page: 0, page_size }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 0;
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page_slice(items, self.page, self.page_size)
    }
}

/// Renders the admin markdown report: threshold summary, category breakdown,
/// per-user aggregates, status mix, and recent activity.
pub fn build_report(
    generated_at: DateTime<Utc>,
    config: &ThresholdConfig,
    stats: &[UserStats],
    rows: &[ResponseRow],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Interview Tracker Report");
    let _ = writeln!(
        output,
        "Generated {} (minimum {} interviews, warning at {}, thresholds active since {})",
        generated_at.format("%Y-%m-%d %H:%M"),
        config.min_interviews,
        config.warning_threshold,
        config.created_at.format("%Y-%m-%d")
    );

    let below: Vec<&UserStats> = stats.iter().filter(|s| s.below_threshold).collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Threshold Status");
    if below.is_empty() {
        let _ = writeln!(output, "All users meet the minimum interview threshold.");
    } else {
        let _ = writeln!(
            output,
            "{} of {} users are below the minimum of {} interviews.",
            below.len(),
            stats.len(),
            config.min_interviews
        );
    }

    let mut excellent = 0usize;
    let mut warning = 0usize;
    let mut critical = 0usize;
    for entry in stats {
        match threshold::classify(entry.total_interviews, config).category {
            Category::Excellent => excellent += 1,
            Category::Warning => warning += 1,
            Category::Critical => critical += 1,
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Categories");
    let _ = writeln!(output, "- Excellent: {excellent}");
    let _ = writeln!(output, "- Warning: {warning}");
    let _ = writeln!(output, "- Critical: {critical}");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Users");
    if stats.is_empty() {
        let _ = writeln!(output, "No users on record.");
    } else {
        for entry in stats.iter() {
            let classification = threshold::classify(entry.total_interviews, config);
            let last_activity = entry
                .last_activity
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "never".to_string());
            let _ = writeln!(
                output,
                "- {}: {} interviews ({} completed, {} incomplete), {:.1}% completion, last active {} [{}]",
                entry.username,
                entry.total_interviews,
                entry.completed_interviews,
                entry.incomplete_interviews,
                entry.completion_rate,
                last_activity,
                classification.category.label()
            );
        }
    }

    let completed = rows
        .iter()
        .filter(|r| r.status == ResponseStatus::Completed)
        .count();
    let incomplete = rows
        .iter()
        .filter(|r| r.status == ResponseStatus::Incomplete)
        .count();
    let drafts = rows
        .iter()
        .filter(|r| r.status == ResponseStatus::Draft)
        .count();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Response Mix");
    let _ = writeln!(
        output,
        "{} responses total: {} completed, {} incomplete, {} drafts.",
        rows.len(),
        completed,
        incomplete,
        drafts
    );

    let mut recent = rows.to_vec();
    recent.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");
    if recent.is_empty() {
        let _ = writeln!(output, "No responses recorded.");
    } else {
        for row in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on \"{}\": {} at {}% ({})",
                row.username,
                row.questionnaire_title,
                row.status.as_str(),
                row.completion_percentage,
                row.last_modified.format("%Y-%m-%d %H:%M")
            );
        }
    }

    output
}
