//! Text rendering of method scores.

use crate::core::scoring::{MethodMap, MethodScores};

const BAR_WIDTH: usize = 10;

/// Compact bar for a score in [0, 1]: `[████████░░] 80%`
pub fn score_bar(score: f64) -> String {
    let percent = score.clamp(0.0, 1.0) * 100.0;
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;

    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        percent
    )
}

/// Per-method scores laid out as aligned rows
pub struct ScoreTable<'a> {
    scores: &'a MethodScores,
    weights: &'a MethodMap<f64>,
}

impl<'a> ScoreTable<'a> {
    pub fn new(scores: &'a MethodScores, weights: &'a MethodMap<f64>) -> Self {
        Self { scores, weights }
    }

    /// One line per method: name, bar, raw score and weight
    pub fn render(&self) -> String {
        let width = self
            .scores
            .iter()
            .map(|(method, _)| method.description().len())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for (method, score) in self.scores.iter() {
            output.push_str(&format!(
                "  {:<width$}  {}  {:.3} (w {:.2})\n",
                method.description(),
                score_bar(*score),
                score,
                self.weights[method],
                width = width
            ));
        }
        output
    }
}
