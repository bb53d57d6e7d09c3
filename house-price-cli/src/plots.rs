use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

fn bounds<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Scatter of predicted against actual prices with the identity line.
pub fn save_prediction_plot(path: &Path, actual: &[f64], predicted: &[f64]) -> Result<(), Box<dyn Error>> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(format!(
            "cannot plot {} predictions against {} actual values",
            predicted.len(),
            actual.len()
        )
        .into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (y_min, y_max) = bounds(actual.iter());
    let (lo, hi) = bounds(actual.iter().chain(predicted));
    let pad = ((hi - lo) * 0.05).max(1.0);

    let root = SVGBackend::new(path, (700, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .caption("Predicted vs Actual", ("sans-serif", 22))
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(lo - pad..hi + pad, lo - pad..hi + pad)?;

    chart
        .configure_mesh()
        .x_desc("Actual SalePrice")
        .y_desc("Predicted SalePrice")
        .axis_style(BLACK.mix(0.6))
        .light_line_style(BLACK.mix(0.06))
        .label_style(("sans-serif", 13))
        .draw()?;

    chart.draw_series(
        actual
            .iter()
            .zip(predicted)
            .map(|(&a, &p)| Circle::new((a, p), 3, BLUE.mix(0.3).filled())),
    )?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(y_min, y_min), (y_max, y_max)],
        RED.stroke_width(2),
    )))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/figures/prediction_vs_actual.svg");
        let actual = [120_000.0, 180_000.0, 250_000.0];
        let predicted = [125_000.0, 170_000.0, 260_000.0];
        save_prediction_plot(&path, &actual, &predicted).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.svg");
        assert!(save_prediction_plot(&path, &[1.0, 2.0], &[1.0]).is_err());
        assert!(save_prediction_plot(&path, &[], &[]).is_err());
    }
}
