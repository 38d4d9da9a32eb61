use crate::models::{
    DashboardStats, Questionnaire, ResponseRow, ResponseStatus, UserRecord, UserStats,
};

/// Rolls one user's responses into summary counters.
///
/// Drafts count toward the total (an opened form is an attempted interview)
/// but toward neither the completed nor the incomplete bucket. Every derived
/// field is order-independent over the input rows.
pub fn build_user_stats(user: &UserRecord, responses: &[ResponseRow]) -> UserStats {
    let mut total = 0usize;
    let mut completed = 0usize;
    let mut incomplete = 0usize;
    let mut last_activity = None;

    for row in responses.iter().filter(|r| r.user_id == user.id) {
        total += 1;
        match row.status {
            ResponseStatus::Completed => completed += 1,
            ResponseStatus::Incomplete => incomplete += 1,
            ResponseStatus::Draft => {}
        }
        last_activity = match last_activity {
            Some(current) if current >= row.last_modified => Some(current),
            _ => Some(row.last_modified),
        };
    }

    let completion_rate = if total == 0 {
        0.0
    } else {
        round_one_decimal(completed as f64 * 100.0 / total as f64)
    };

    UserStats {
        user_id: user.id,
        username: user.username.clone(),
        total_interviews: total,
        completed_interviews: completed,
        incomplete_interviews: incomplete,
        completion_rate,
        last_activity,
        below_threshold: false,
    }
}

/// Stats for every user, sorted by username for stable listings.
pub fn build_all_user_stats(users: &[UserRecord], responses: &[ResponseRow]) -> Vec<UserStats> {
    let mut stats: Vec<UserStats> = users
        .iter()
        .map(|user| build_user_stats(user, responses))
        .collect();
    stats.sort_by(|a, b| a.username.cmp(&b.username));
    stats
}

/// Admin overview counters. The average completion rate is the mean of
/// per-user rates across users with at least one response.
pub fn dashboard(
    users: &[UserRecord],
    questionnaires: &[Questionnaire],
    responses: &[ResponseRow],
    stats: &[UserStats],
) -> DashboardStats {
    let active: Vec<&UserStats> = stats.iter().filter(|s| s.total_interviews > 0).collect();
    let average_completion_rate = if active.is_empty() {
        0.0
    } else {
        round_one_decimal(
            active.iter().map(|s| s.completion_rate).sum::<f64>() / active.len() as f64,
        )
    };

    DashboardStats {
        total_users: users.len(),
        active_users: users.iter().filter(|u| u.is_active).count(),
        total_questionnaires: questionnaires.len(),
        active_questionnaires: questionnaires.iter().filter(|q| q.is_active).count(),
        total_interviews: responses.len(),
        completed_interviews: responses
            .iter()
            .filter(|r| r.status == ResponseStatus::Completed)
            .count(),
        users_below_threshold: stats.iter().filter(|s| s.below_threshold).count(),
        average_completion_rate,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
