use crate::error::{PipelineError, PipelineResult};
use crate::estimator::{Regressor, TrainedModel};
use crate::roster::RosterEntry;
use house_price_core::Matrix;
use house_price_metrics::{mae, r2_score, rmse};
use std::time::Instant;
use tracing::info;

/// A fitted roster entry with its validation scores.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub model: TrainedModel,
    pub rmse: f64,
    pub r2: f64,
}

/// Fit every roster entry on the training matrix and score it on the
/// validation matrix. Candidates come back in roster order; the first
/// failing model aborts the run.
pub fn train_and_evaluate(
    roster: Vec<RosterEntry>,
    x_train: &Matrix,
    x_valid: &Matrix,
    y_train: &[f64],
    y_valid: &[f64],
) -> PipelineResult<Vec<Candidate>> {
    let mut candidates = Vec::with_capacity(roster.len());
    for RosterEntry { name, mut model } in roster {
        let wrap = |source| PipelineError::Model {
            name: name.clone(),
            source,
        };

        info!(model = %name, kind = model.kind(), "training");
        let start = Instant::now();
        model.fit(x_train, y_train).map_err(wrap)?;
        let pred = model.predict(x_valid).map_err(wrap)?;

        let rmse = rmse(y_valid, &pred).map_err(wrap)?;
        let r2 = r2_score(y_valid, &pred).map_err(wrap)?;
        let mae = mae(y_valid, &pred).map_err(wrap)?;
        info!(
            model = %name,
            rmse,
            r2,
            mae,
            secs = start.elapsed().as_secs_f64(),
            "validation scores"
        );

        candidates.push(Candidate {
            name,
            model,
            rmse,
            r2,
        });
    }
    Ok(candidates)
}

/// Lowest validation RMSE wins; on a tie the earlier candidate is kept.
pub fn select_best(candidates: Vec<Candidate>) -> PipelineResult<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(b) if candidate.rmse >= b.rmse || candidate.rmse.is_nan() => {}
            _ => best = Some(candidate),
        }
    }
    let best = best.ok_or(PipelineError::EmptyRoster)?;
    info!(model = %best.name, rmse = best.rmse, r2 = best.r2, "selected best model");
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use house_price_linear::LinearRegression;

    fn candidate(name: &str, rmse: f64) -> Candidate {
        Candidate {
            name: name.to_string(),
            model: TrainedModel::Linear(LinearRegression::new(true)),
            rmse,
            r2: 0.0,
        }
    }

    #[test]
    fn test_select_best_prefers_first_on_ties() {
        let candidates = vec![
            candidate("first", 10.2),
            candidate("second", 9.8),
            candidate("third", 11.0),
            candidate("fourth", 9.8),
        ];
        assert_eq!(select_best(candidates).unwrap().name, "second");
    }

    #[test]
    fn test_select_best_empty() {
        assert!(matches!(select_best(Vec::new()), Err(PipelineError::EmptyRoster)));
    }

    #[test]
    fn test_train_and_evaluate_scores_in_roster_order() {
        let x = Matrix::from_vec2d(&(0..20).map(|i| vec![i as f64]).collect::<Vec<_>>()).unwrap();
        let y: Vec<f64> = (0..20).map(|i| 3.0 * i as f64 + 2.0).collect();
        let roster = vec![
            RosterEntry::new("a", TrainedModel::Linear(LinearRegression::new(true))),
            RosterEntry::new("b", TrainedModel::Linear(LinearRegression::new(false))),
        ];
        let candidates = train_and_evaluate(roster, &x, &x, &y, &y).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "a");
        assert_abs_diff_eq!(candidates[0].rmse, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(candidates[0].r2, 1.0, epsilon = 1e-10);
        assert!(candidates[1].rmse > candidates[0].rmse);
    }

    #[test]
    fn test_model_failure_names_the_model() {
        let x = Matrix::zeros(0, 1);
        let roster = vec![RosterEntry::new("broken", TrainedModel::Linear(LinearRegression::new(true)))];
        match train_and_evaluate(roster, &x, &x, &[], &[]) {
            Err(PipelineError::Model { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected model error, got {:?}", other.map(|c| c.len())),
        }
    }
}
