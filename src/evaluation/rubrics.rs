//! Default rubrics, one per practice type. Criterion weights always sum to 1.

use crate::models::practice::{PracticeType, RubricCriterion};

fn criterion(name: &str, weight: f64, description: &str) -> RubricCriterion {
    RubricCriterion {
        name: name.to_string(),
        weight,
        description: description.to_string(),
    }
}

/// The default criteria for a practice type. Created lazily in the store the
/// first time an item of the type is generated or evaluated.
pub fn default_criteria(practice_type: PracticeType) -> Vec<RubricCriterion> {
    match practice_type {
        // Both quiz forms score correctness first, understanding second.
        PracticeType::QuizMcq | PracticeType::QuizShort => vec![
            criterion("Correctness", 0.7, "Whether the answer is correct"),
            criterion(
                "Understanding",
                0.3,
                "Demonstrates understanding of the underlying concept",
            ),
        ],
        PracticeType::Flashcard => vec![criterion(
            "Recall Accuracy",
            1.0,
            "Ability to recall the correct information",
        )],
        PracticeType::Behavioral => vec![
            criterion(
                "STAR Structure",
                0.3,
                "Proper use of the Situation, Task, Action, Result framework",
            ),
            criterion("Relevance", 0.2, "Relevance to the question asked"),
            criterion("Specificity", 0.2, "Use of specific examples and details"),
            criterion("Impact", 0.3, "Clear demonstration of impact and results"),
        ],
        PracticeType::SystemDesign => vec![
            criterion(
                "Requirements",
                0.2,
                "Clear identification of functional and non-functional requirements",
            ),
            criterion(
                "Architecture",
                0.3,
                "Well-structured system architecture with components",
            ),
            criterion(
                "Scalability",
                0.2,
                "Consideration of scalability and performance",
            ),
            criterion(
                "Trade-offs",
                0.2,
                "Discussion of trade-offs and alternatives",
            ),
            criterion(
                "Completeness",
                0.1,
                "Coverage of data flow, APIs and operational concerns",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [PracticeType; 5] = [
        PracticeType::QuizMcq,
        PracticeType::QuizShort,
        PracticeType::Flashcard,
        PracticeType::Behavioral,
        PracticeType::SystemDesign,
    ];

    #[test]
    fn test_every_default_rubric_sums_to_one() {
        for practice_type in ALL_TYPES {
            let criteria = default_criteria(practice_type);
            let sum: f64 = criteria.iter().map(|c| c.weight).sum();
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "{practice_type:?} weights sum to {sum}"
            );
        }
    }

    #[test]
    fn test_every_weight_is_positive_and_at_most_one() {
        for practice_type in ALL_TYPES {
            for criterion in default_criteria(practice_type) {
                assert!(criterion.weight > 0.0 && criterion.weight <= 1.0);
            }
        }
    }

    #[test]
    fn test_mcq_rubric_shape() {
        let criteria = default_criteria(PracticeType::QuizMcq);
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].name, "Correctness");
        assert_eq!(criteria[0].weight, 0.7);
    }

    #[test]
    fn test_flashcard_rubric_is_single_criterion() {
        let criteria = default_criteria(PracticeType::Flashcard);
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].weight, 1.0);
    }
}
