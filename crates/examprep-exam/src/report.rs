//! Score summary for a graded exam.

use core::fmt::{Display, Formatter, Result as FmtResult};
use examprep_core::types::MAX_MARKS;
use serde::Serialize;

use crate::store::SessionState;

/// Feedback shown for questions that were not graded
pub const NOT_EVALUATED: &str = "Not evaluated.";

/// One question's line in the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    /// 1-based question number
    pub number: usize,
    /// Question text
    pub question: String,
    /// Submitted answer (empty if none)
    pub answer: String,
    /// Marks awarded, `None` if not graded
    pub marks: Option<u8>,
    /// Grader feedback
    pub feedback: String,
}

/// Per-question results and totals.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    /// Rows in question order
    pub rows: Vec<ReportRow>,
    /// Sum of awarded marks
    pub total: u32,
    /// Maximum attainable over the graded questions
    pub maximum: u32,
    /// `total / maximum` as a percentage, 0 when nothing was graded
    pub percentage: f64,
}

impl ScoreReport {
    /// Build the report for the current exam in `state`.
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        let rows: Vec<ReportRow> = state
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let number = index + 1;
                let graded = state.evaluations.get(&number);
                ReportRow {
                    number,
                    question: question.text().to_owned(),
                    answer: state.answers.get(&number).cloned().unwrap_or_default(),
                    marks: graded.map(|entry| entry.evaluation.marks),
                    feedback: graded.map_or_else(
                        || NOT_EVALUATED.to_owned(),
                        |entry| entry.evaluation.feedback.clone(),
                    ),
                }
            })
            .collect();

        let graded_marks: Vec<u32> = rows
            .iter()
            .filter_map(|row| row.marks.map(u32::from))
            .collect();
        let total = graded_marks.iter().sum();
        let maximum = graded_marks.len() as u32 * u32::from(MAX_MARKS);
        let percentage = if maximum == 0 {
            0.0
        } else {
            f64::from(total) / f64::from(maximum) * 100.0
        };

        Self {
            rows,
            total,
            maximum,
            percentage,
        }
    }
}

impl Display for ScoreReport {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        for row in &self.rows {
            writeln!(formatter, "Q{}. {}", row.number, row.question)?;
            writeln!(formatter, "   Your answer: {}", row.answer)?;
            match row.marks {
                Some(marks) => writeln!(formatter, "   Marks: {marks}/{MAX_MARKS}")?,
                None => writeln!(formatter, "   Marks: -")?,
            }
            writeln!(formatter, "   Feedback: {}", row.feedback)?;
        }
        write!(
            formatter,
            "Total: {}/{} ({:.1}%)",
            self.total, self.maximum, self.percentage
        )
    }
}
