//! Chart rendering with Plotters for the churn reports

use crate::data::FEATURE_COUNT;
use crate::report::{
    CohortSimulation, GaugeZone, RevenueProjection, RiskTopology, COHORT_BINS,
    FEATURE_IMPORTANCES, TOPOLOGY_AXES,
};
use crate::session::PredictionResult;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

const CRIMSON: RGBColor = RGBColor(244, 63, 94);
const EMERALD: RGBColor = RGBColor(16, 185, 129);
const AMBER: RGBColor = RGBColor(245, 158, 11);

fn zone_color(zone: GaugeZone) -> RGBColor {
    match zone {
        GaugeZone::Secure => EMERALD,
        GaugeZone::Elevated => AMBER,
        GaugeZone::Critical => CRIMSON,
    }
}

/// Closed polygon for radar values, first axis pointing up, clockwise
pub fn radar_points(values: &[f64]) -> Vec<(f64, f64)> {
    let n = values.len();
    let mut points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let theta = PI / 2.0 - 2.0 * PI * i as f64 / n as f64;
            (r * theta.cos(), r * theta.sin())
        })
        .collect();
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}

/// Ring segment of the half-circle gauge between two percentages.
/// 0% sits on the left, 100% on the right.
pub fn gauge_segment(from_pct: f64, to_pct: f64, inner: f64, outer: f64) -> Vec<(f64, f64)> {
    const STEPS: usize = 32;
    let angle = |pct: f64| PI * (1.0 - pct.clamp(0.0, 100.0) / 100.0);

    let outer_arc = (0..=STEPS).map(|s| {
        let pct = from_pct + (to_pct - from_pct) * s as f64 / STEPS as f64;
        let a = angle(pct);
        (outer * a.cos(), outer * a.sin())
    });
    let inner_arc = (0..=STEPS).rev().map(|s| {
        let pct = from_pct + (to_pct - from_pct) * s as f64 / STEPS as f64;
        let a = angle(pct);
        (inner * a.cos(), inner * a.sin())
    });
    outer_arc.chain(inner_arc).collect()
}

/// Radar of the customer's risk topology against the ideal profile
pub fn create_radar_chart(topology: &RiskTopology, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (700, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Churn Risk Topology", ("sans-serif", 30))
        .margin(20)
        .build_cartesian_2d(-1.5f64..1.5f64, -1.4f64..1.4f64)?;

    // rings and spokes
    for ring in [0.25, 0.5, 0.75, 1.0] {
        chart.draw_series(std::iter::once(PathElement::new(
            radar_points(&[ring; 6]),
            BLACK.mix(0.15),
        )))?;
    }
    for &(x, y) in radar_points(&[1.0; 6]).iter().take(TOPOLOGY_AXES.len()) {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 0.0), (x, y)],
            BLACK.mix(0.15),
        )))?;
    }

    chart
        .draw_series(std::iter::once(Polygon::new(
            radar_points(&topology.values),
            CRIMSON.mix(0.25),
        )))?
        .label("Current Customer Profile")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], CRIMSON.filled()));
    chart.draw_series(std::iter::once(PathElement::new(
        radar_points(&topology.values),
        CRIMSON.stroke_width(3),
    )))?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            radar_points(&topology.ideal),
            EMERALD.stroke_width(2),
        )))?
        .label("Ideal Retention Profile")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], EMERALD.stroke_width(2)));

    for (label, &(x, y)) in TOPOLOGY_AXES.iter().zip(radar_points(&[1.15; 6]).iter()) {
        chart.draw_series(std::iter::once(Text::new(
            label.to_string(),
            (x - 0.25, y),
            ("sans-serif", 15),
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Half-circle gauge with the three risk zones and a needle
pub fn create_gauge_chart(result: &PredictionResult, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (700, 420)).into_drawing_area();
    root.fill(&WHITE)?;

    let zone = GaugeZone::for_risk(result.risk_pct);
    let title = format!("Churn Risk {:.1}% ({})", result.risk_pct, zone.label());

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .build_cartesian_2d(-1.2f64..1.2f64, -0.2f64..1.2f64)?;

    for band in [GaugeZone::Secure, GaugeZone::Elevated, GaugeZone::Critical] {
        let (from, to) = band.range();
        chart.draw_series(std::iter::once(Polygon::new(
            gauge_segment(from, to, 0.7, 1.0),
            zone_color(band).mix(0.35),
        )))?;
    }

    chart.draw_series(std::iter::once(Polygon::new(
        gauge_segment(0.0, result.risk_pct, 0.78, 0.92),
        zone_color(zone).filled(),
    )))?;

    let needle = PI * (1.0 - result.risk_pct / 100.0);
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, 0.0), (0.9 * needle.cos(), 0.9 * needle.sin())],
        BLACK.stroke_width(3),
    )))?;

    root.present()?;
    Ok(())
}

/// Secured versus at-risk annual revenue
pub fn create_revenue_chart(revenue: &RevenueProjection, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_value = revenue.annual_revenue.max(1.0);
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Total Annual Value ${:.0}", revenue.annual_revenue),
            ("sans-serif", 26),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..2f64, 0f64..(max_value * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&|x| {
            if *x < 1.0 {
                "Revenue Secured".to_string()
            } else {
                "Capital At Risk".to_string()
            }
        })
        .y_desc("Annual revenue ($)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let bars = [
        (0.0, revenue.revenue_secured, EMERALD),
        (1.0, revenue.revenue_at_risk, CRIMSON),
    ];
    for (x, value, color) in bars {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x + 0.15, 0.0), (x + 0.85, value)],
            color.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Histogram of the simulated cohort with the individual's risk marked
pub fn create_cohort_chart(cohort: &CohortSimulation, output_path: &Path) -> crate::Result<()> {
    let counts = cohort.histogram(COHORT_BINS);
    let max_count = *counts.iter().max().unwrap_or(&1) as f64;
    let width = 100.0 / COHORT_BINS as f64;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cohort Variance Simulation", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..100f64, 0f64..(max_count * 1.2).max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("Simulated Churn Probability (%)")
        .y_desc("Count of Customers in Cohort")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(bin, &count)| {
        let x0 = bin as f64 * width;
        Rectangle::new([(x0, 0.0), (x0 + width, count as f64)], CRIMSON.mix(0.7).filled())
    }))?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(cohort.base_risk, 0.0), (cohort.base_risk, max_count * 1.15)],
            BLACK.stroke_width(2),
        )))?
        .label(format!("Target Individual Risk: {:.1}%", cohort.base_risk))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Horizontal bars of the illustrative feature importances
pub fn create_importance_chart(output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (700, 450)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..0.4f64, -0.5f64..(FEATURE_COUNT as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(FEATURE_COUNT)
        .y_label_formatter(&|y| {
            let index = y.round();
            if index < 0.0 {
                return String::new();
            }
            FEATURE_IMPORTANCES
                .get(index as usize)
                .map(|(feature, _)| feature.name().to_string())
                .unwrap_or_default()
        })
        .x_desc("Importance share")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(FEATURE_IMPORTANCES.iter().enumerate().map(|(i, (_, weight))| {
        let y = i as f64;
        Rectangle::new([(0.0, y - 0.35), (*weight, y + 0.35)], CRIMSON.mix(0.4 + weight).filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Render every chart for the session's latest result into `output_dir`
pub fn generate_chart_report(
    topology: &RiskTopology,
    result: &PredictionResult,
    revenue: &RevenueProjection,
    cohort: &CohortSimulation,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let radar = output_dir.join("risk_topology.png");
    create_radar_chart(topology, &radar)?;

    let gauge = output_dir.join("risk_gauge.png");
    create_gauge_chart(result, &gauge)?;

    let revenue_path = output_dir.join("revenue_split.png");
    create_revenue_chart(revenue, &revenue_path)?;

    let cohort_path = output_dir.join("cohort_variance.png");
    create_cohort_chart(cohort, &cohort_path)?;

    let importance = output_dir.join("feature_importance.png");
    create_importance_chart(&importance)?;

    let written = vec![radar, gauge, revenue_path, cohort_path, importance];
    for path in &written {
        log::debug!("Chart saved to: {}", path.display());
    }
    Ok(written)
}
