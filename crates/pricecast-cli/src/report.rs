//! Training run reporting.

use pricecast_core::SelectionOutcome;

/// Render the per-commodity training summary as an aligned text table:
/// the winning family, its held-out MAPE and the derived accuracy.
pub fn render_summary(outcomes: &[SelectionOutcome]) -> String {
    if outcomes.is_empty() {
        return "no commodities were trained\n".to_string();
    }

    let name_width = outcomes
        .iter()
        .map(|o| o.commodity.len())
        .chain(std::iter::once("Commodity".len()))
        .max()
        .unwrap_or(0);
    let model_width = outcomes
        .iter()
        .map(|o| o.winner.to_string().len())
        .chain(std::iter::once("Model".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<name_width$}  {:<model_width$}  {:>8}  {:>8}\n",
        "Commodity", "Model", "MAPE", "Accuracy"
    ));
    for outcome in outcomes {
        out.push_str(&format!(
            "{:<name_width$}  {:<model_width$}  {:>7.2}%  {:>7.2}%\n",
            outcome.commodity,
            outcome.winner.to_string(),
            outcome.mape,
            100.0 - outcome.mape
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pricecast_core::{
        CandidateScore, ModelDescriptor, ModelFamily, MonthlySeries, SeasonalMode, SmoothingParams,
    };

    fn outcome(commodity: &str, winner: ModelFamily, mape: f64) -> SelectionOutcome {
        let months: Vec<NaiveDate> = (0..24)
            .map(|i| NaiveDate::from_ymd_opt(2024 + i / 12, (i % 12 + 1) as u32, 1).unwrap())
            .collect();
        SelectionOutcome {
            commodity: commodity.to_string(),
            winner,
            mape,
            scores: vec![CandidateScore {
                family: winner,
                mape,
            }],
            descriptor: ModelDescriptor::Smoothing {
                log_transformed: false,
                params: SmoothingParams::new(SeasonalMode::Additive, 12),
                history: MonthlySeries {
                    months,
                    values: (0..24).map(|i| 100.0 + i as f64).collect(),
                },
            },
        }
    }

    #[test]
    fn renders_winner_mape_and_accuracy() {
        let rendered = render_summary(&[
            outcome("Beras", ModelFamily::Smoothing, 6.5),
            outcome("Minyak Goreng Curah", ModelFamily::Ensemble, 12.25),
        ]);

        assert!(rendered.contains("Commodity"));
        assert!(rendered.contains("Beras"));
        assert!(rendered.contains("smoothing"));
        assert!(rendered.contains("6.50%"));
        assert!(rendered.contains("93.50%"));
        assert!(rendered.contains("ensemble"));
        assert!(rendered.contains("87.75%"));
    }

    #[test]
    fn empty_run_renders_a_notice() {
        assert_eq!(render_summary(&[]), "no commodities were trained\n");
    }
}
