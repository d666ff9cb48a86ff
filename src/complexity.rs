//! Task complexity assessment
//!
//! Pure scoring of a task from descriptive and structural metrics. Each
//! metric maps its magnitude to a tier against fixed thresholds and the
//! final level is the maximum across metrics, so one oversized dimension is
//! enough to escalate. No side effects; callers decide what to do with the
//! verdict.

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::repo::TaskVault;
use crate::task::Task;

// Tier thresholds per metric (inclusive lower bounds).
const DESCRIPTION_MEDIUM: usize = 500;
const DESCRIPTION_HIGH: usize = 1000;
const DESCRIPTION_VERY_HIGH: usize = 2000;

const DEPENDENCIES_MEDIUM: usize = 2;
const DEPENDENCIES_HIGH: usize = 5;
const DEPENDENCIES_VERY_HIGH: usize = 10;

const NOTES_MEDIUM: usize = 200;
const NOTES_HIGH: usize = 500;
const NOTES_VERY_HIGH: usize = 1000;

/// Qualitative complexity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Raw metrics the assessment was computed from
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComplexityMetrics {
    pub description_length: usize,
    pub dependencies_count: usize,
    pub notes_length: usize,
    pub has_notes: bool,
}

/// Assessment verdict: tier, metrics, and advisory text
#[derive(Debug, Clone, Serialize)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub metrics: ComplexityMetrics,
    pub recommendations: Vec<String>,
}

fn tier(value: usize, medium: usize, high: usize, very_high: usize) -> ComplexityLevel {
    if value >= very_high {
        ComplexityLevel::VeryHigh
    } else if value >= high {
        ComplexityLevel::High
    } else if value >= medium {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    }
}

/// Score a task's complexity
pub fn assess(task: &Task) -> ComplexityAssessment {
    let description_length = task.description.chars().count();
    let dependencies_count = task.dependencies.len();
    let notes_length = task
        .notes
        .as_ref()
        .map(|notes| notes.chars().count())
        .unwrap_or(0);

    let level = tier(
        description_length,
        DESCRIPTION_MEDIUM,
        DESCRIPTION_HIGH,
        DESCRIPTION_VERY_HIGH,
    )
    .max(tier(
        dependencies_count,
        DEPENDENCIES_MEDIUM,
        DEPENDENCIES_HIGH,
        DEPENDENCIES_VERY_HIGH,
    ))
    .max(tier(notes_length, NOTES_MEDIUM, NOTES_HIGH, NOTES_VERY_HIGH));

    let mut recommendations = Vec::new();
    match level {
        ComplexityLevel::Low => {
            recommendations.push("Low complexity; safe to execute directly.".to_string());
            recommendations.push(
                "Set clear completion criteria so verification has an unambiguous basis."
                    .to_string(),
            );
        }
        ComplexityLevel::Medium => {
            recommendations
                .push("Moderately complex; plan the execution steps before starting.".to_string());
            recommendations.push(
                "Work in stages and check progress against the plan as you go.".to_string(),
            );
            if dependencies_count > 0 {
                recommendations.push(
                    "Check the completion state and output quality of every dependency."
                        .to_string(),
                );
            }
        }
        ComplexityLevel::High => {
            recommendations
                .push("High complexity; invest in analysis and planning first.".to_string());
            recommendations.push(
                "Consider splitting this into smaller, independently executable tasks."
                    .to_string(),
            );
            recommendations.push(
                "Define milestones and checkpoints to track progress and quality.".to_string(),
            );
            if dependencies_count > DEPENDENCIES_MEDIUM {
                recommendations.push(
                    "Many dependencies; map their ordering before starting.".to_string(),
                );
            }
        }
        ComplexityLevel::VeryHigh => {
            recommendations.push(
                "Very high complexity; strongly consider splitting this into multiple independent tasks."
                    .to_string(),
            );
            recommendations.push(
                "Analyze thoroughly up front and define the scope and interface of each piece."
                    .to_string(),
            );
            recommendations.push(
                "Assess the risks and prepare fallbacks for the likely blockers.".to_string(),
            );
            recommendations.push(
                "Establish concrete test and verification criteria for each piece.".to_string(),
            );
            if description_length >= DESCRIPTION_VERY_HIGH {
                recommendations.push(
                    "The description is very long; distill the key points into a structured checklist."
                        .to_string(),
                );
            }
            if dependencies_count >= DEPENDENCIES_HIGH {
                recommendations.push(
                    "The dependency count is unusually high; re-evaluate the task boundaries."
                        .to_string(),
                );
            }
        }
    }

    ComplexityAssessment {
        level,
        metrics: ComplexityMetrics {
            description_length,
            dependencies_count,
            notes_length,
            has_notes: task.notes.is_some(),
        },
        recommendations,
    }
}

impl TaskVault {
    /// Assess the complexity of a stored task; `None` when the id is unknown
    pub async fn assess_complexity(
        &self,
        requirement: &str,
        id: Uuid,
    ) -> Result<Option<ComplexityAssessment>> {
        let task = self.get_task(requirement, id).await?;
        Ok(task.as_ref().map(assess))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDependency;

    fn task_with(description_len: usize, deps: usize, notes_len: usize) -> Task {
        let mut task = Task::new("t", "x".repeat(description_len));
        task.dependencies = (0..deps)
            .map(|_| TaskDependency {
                task_id: Uuid::new_v4(),
            })
            .collect();
        if notes_len > 0 {
            task.notes = Some("n".repeat(notes_len));
        }
        task
    }

    #[test]
    fn small_tasks_score_low() {
        let assessment = assess(&task_with(100, 0, 0));
        assert_eq!(assessment.level, ComplexityLevel::Low);
        assert!(!assessment.metrics.has_notes);
    }

    #[test]
    fn each_metric_escalates_independently() {
        assert_eq!(assess(&task_with(500, 0, 0)).level, ComplexityLevel::Medium);
        assert_eq!(assess(&task_with(0, 5, 0)).level, ComplexityLevel::High);
        assert_eq!(
            assess(&task_with(0, 0, 1000)).level,
            ComplexityLevel::VeryHigh
        );
    }

    #[test]
    fn final_level_is_the_maximum_across_metrics() {
        // Medium description, high dependency count: high wins.
        let assessment = assess(&task_with(600, 6, 0));
        assert_eq!(assessment.level, ComplexityLevel::High);
    }

    #[test]
    fn oversized_description_always_scores_very_high() {
        let assessment = assess(&task_with(2000, 0, 0));
        assert_eq!(assessment.level, ComplexityLevel::VeryHigh);
        assert!(assessment
            .recommendations
            .iter()
            .any(|line| line.contains("description is very long")));
    }

    #[test]
    fn very_high_refines_advice_by_sub_thresholds() {
        let with_deps = assess(&task_with(100, 10, 0));
        assert_eq!(with_deps.level, ComplexityLevel::VeryHigh);
        assert!(with_deps
            .recommendations
            .iter()
            .any(|line| line.contains("dependency count is unusually high")));
        assert!(!with_deps
            .recommendations
            .iter()
            .any(|line| line.contains("description is very long")));
    }

    #[test]
    fn medium_mentions_dependencies_only_when_present() {
        let without = assess(&task_with(500, 0, 0));
        assert!(!without
            .recommendations
            .iter()
            .any(|line| line.contains("dependency")));

        let with = assess(&task_with(500, 2, 0));
        assert!(with
            .recommendations
            .iter()
            .any(|line| line.contains("every dependency")));
    }
}
