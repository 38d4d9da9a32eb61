use crate::error::Error;
use crate::models::{ThresholdConfig, UserStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Excellent,
    Warning,
    Critical,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Excellent => "Excellent",
            Category::Warning => "Warning",
            Category::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub below_threshold: bool,
}

/// Classifies a user's interview count against the active thresholds.
///
/// The checks run in a fixed order (Excellent, then Warning, else Critical),
/// so a misconfigured warning threshold at or above the minimum still yields a
/// deterministic answer instead of an invalid band.
pub fn classify(total_interviews: usize, config: &ThresholdConfig) -> Classification {
    let total = total_interviews as i64;
    let category = if total >= config.min_interviews {
        Category::Excellent
    } else if total >= config.warning_threshold {
        Category::Warning
    } else {
        Category::Critical
    };

    Classification {
        category,
        below_threshold: total < config.min_interviews,
    }
}

pub fn is_below(total_interviews: usize, config: &ThresholdConfig) -> bool {
    (total_interviews as i64) < config.min_interviews
}

/// Stamps the below-threshold flag on a batch of user stats.
pub fn apply(stats: &mut [UserStats], config: &ThresholdConfig) {
    for entry in stats.iter_mut() {
        entry.below_threshold = is_below(entry.total_interviews, config);
    }
}

/// Both values must be at least 1. Nothing enforces warning < minimum; the
/// classifier's fixed evaluation order keeps overlapping ranges well-defined.
pub fn validate_config(min_interviews: i64, warning_threshold: i64) -> Result<(), Error> {
    if min_interviews < 1 {
        return Err(Error::validation(
            "min_interviews",
            "must be at least 1",
        ));
    }
    if warning_threshold < 1 {
        return Err(Error::validation(
            "warning_threshold",
            "must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn config(min: i64, warning: i64) -> ThresholdConfig {
        ThresholdConfig {
            id: Uuid::new_v4(),
            min_interviews: min,
            warning_threshold: warning,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bands_split_at_warning_and_minimum() {
        let cfg = config(10, 8);

        let at_warning = classify(8, &cfg);
        assert_eq!(at_warning.category, Category::Warning);
        assert!(at_warning.below_threshold);

        let at_minimum = classify(10, &cfg);
        assert_eq!(at_minimum.category, Category::Excellent);
        assert!(!at_minimum.below_threshold);

        let below_warning = classify(7, &cfg);
        assert_eq!(below_warning.category, Category::Critical);
        assert!(below_warning.below_threshold);
    }

    #[test]
    fn minimum_boundary_is_inclusive_for_excellent() {
        let cfg = config(5, 3);
        assert_eq!(classify(5, &cfg).category, Category::Excellent);
        assert_eq!(classify(4, &cfg).category, Category::Warning);
    }

    #[test]
    fn zero_interviews_is_critical() {
        let cfg = config(10, 8);
        let result = classify(0, &cfg);
        assert_eq!(result.category, Category::Critical);
        assert!(result.below_threshold);
    }

    #[test]
    fn inverted_thresholds_still_classify_deterministically() {
        // warning above minimum empties the Warning band.
        let cfg = config(5, 9);
        assert_eq!(classify(6, &cfg).category, Category::Excellent);
        assert_eq!(classify(5, &cfg).category, Category::Excellent);
        assert_eq!(classify(4, &cfg).category, Category::Critical);
    }

    #[test]
    fn config_values_below_one_are_rejected() {
        assert!(matches!(
            validate_config(0, 3),
            Err(Error::Validation { field: "min_interviews", .. })
        ));
        assert!(matches!(
            validate_config(3, 0),
            Err(Error::Validation { field: "warning_threshold", .. })
        ));
        assert!(validate_config(1, 1).is_ok());
    }

    #[test]
    fn apply_flags_only_users_below_minimum() {
        let cfg = config(10, 8);
        let make = |total| UserStats {
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            total_interviews: total,
            completed_interviews: 0,
            incomplete_interviews: 0,
            completion_rate: 0.0,
            last_activity: None,
            below_threshold: false,
        };
        let mut stats = vec![make(12), make(9)];

        apply(&mut stats, &cfg);
        assert!(!stats[0].below_threshold);
        assert!(stats[1].below_threshold);
    }
}
