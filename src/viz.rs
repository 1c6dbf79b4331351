//! Chart rendering with Plotters and the console report

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::data::days_to_date;
use crate::model::RfvTable;
use crate::segment::{Band, Metric, RfvScore};

/// Line colors, cycled when there are more series
const SERIES_COLORS: [RGBColor; 5] = [BLUE, RED, GREEN, MAGENTA, CYAN];

/// One named line of `(day number, value)` points
#[derive(Debug, Clone, PartialEq)]
pub struct DateSeries {
    pub label: String,
    pub points: Vec<(i32, f64)>,
}

/// Draw a vertical bar chart with one labelled bar per entry
pub fn draw_bar_chart(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    bars: &[(String, f64)],
) -> crate::Result<()> {
    if bars.is_empty() {
        anyhow::bail!("no bars to draw for '{}'", title);
    }

    let max_value = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let min_value = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::min);
    let y_top = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..bars.len()).into_segmented(), min_value * 1.1..y_top)?;

    let label_of = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(i) => bars
            .get(*i)
            .map(|(label, _)| label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label_of)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(4)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
    )?;

    root.present()?;
    info!(path = %output_path.display(), "bar chart saved");
    Ok(())
}

/// Draw one line per series against a date axis
pub fn draw_date_lines(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[DateSeries],
) -> crate::Result<()> {
    let points = series.iter().flat_map(|s| s.points.iter());
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(day, value) in points {
        x_min = x_min.min(day as f64);
        x_max = x_max.max(day as f64);
        y_min = y_min.min(value);
        y_max = y_max.max(value);
    }
    if !x_min.is_finite() {
        anyhow::bail!("no points to draw for '{}'", title);
    }

    // Pad so single-point and flat series still get a visible range
    let y_pad = ((y_max - y_min) * 0.1).max(1.0);

    let root = BitMapBackend::new(output_path, (1500, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min - 1.0..x_max + 1.0, y_min - y_pad..y_max + y_pad)?;

    let date_label = |x: &f64| {
        days_to_date(x.round() as i32)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_label_formatter(&date_label)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, line) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                line.points.iter().map(|&(day, value)| (day as f64, value)),
                color.stroke_width(2),
            ))?
            .label(line.label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    info!(path = %output_path.display(), "line chart saved");
    Ok(())
}

/// Bar chart of how many customers received each RFV score
pub fn create_score_distribution_chart(table: &RfvTable, output_path: &Path) -> crate::Result<()> {
    let bars: Vec<(String, f64)> = table
        .score_counts()
        .into_iter()
        .map(|(score, count)| (score.to_string(), count as f64))
        .collect();

    draw_bar_chart(
        output_path,
        "RFV score distribution",
        "RFV score",
        "Customers",
        &bars,
    )
}

/// Print thresholds, band counts, best customers and action counts to stdout
pub fn print_rfv_statistics(table: &RfvTable) {
    println!("\n=== Quartiles ===");
    println!("  Quantile | {:>10} | {:>10} | {:>12}", "Recencia", "Frequencia", "Valor");
    println!("  ---------|------------|------------|-------------");
    let t = &table.thresholds;
    for (label, r, f, v) in [
        ("0.25", t.recency.q25, t.frequency.q25, t.value.q25),
        ("0.50", t.recency.q50, t.frequency.q50, t.value.q50),
        ("0.75", t.recency.q75, t.frequency.q75, t.value.q75),
    ] {
        println!("  {:>8} | {:>10.2} | {:>10.2} | {:>12.2}", label, r, f, v);
    }

    println!("\n=== Band sizes ===");
    println!("  Metric     |     A |     B |     C |     D");
    for metric in Metric::ALL {
        let counts = table.band_counts(metric);
        println!(
            "  {:<10} | {:>5} | {:>5} | {:>5} | {:>5}",
            metric.column_name(),
            counts[Band::A.index()],
            counts[Band::B.index()],
            counts[Band::C.index()],
            counts[Band::D.index()]
        );
    }

    println!("\n=== RFV scores ===");
    for (score, count) in table.score_counts() {
        let percentage = (count as f64 / table.len() as f64) * 100.0;
        println!("  {}: {} customers ({:.1}%)", score, count, percentage);
    }

    let best = RfvScore::new(Band::A, Band::A, Band::A);
    let top = table.top_customers(best, 10);
    if !top.is_empty() {
        println!("\n=== Top AAA customers by value ===");
        for customer in top {
            let m = &customer.metrics;
            println!(
                "  {:<12} recency={:<5} frequency={:<5} value={:.2}",
                m.customer_id, m.recency, m.frequency, m.value
            );
        }
    }

    println!("\n=== Customers per action ===");
    for (action, count) in table.action_counts() {
        println!("  {:>6}  {}", count, action.as_deref().unwrap_or("<no action>"));
    }
}

/// Print the statistics and save the score distribution chart
pub fn generate_rfv_report(table: &RfvTable, chart_path: &Path) -> crate::Result<()> {
    print_rfv_statistics(table);
    create_score_distribution_chart(table, chart_path)
}
