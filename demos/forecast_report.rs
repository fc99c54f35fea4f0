use usage_quota_forecaster::{
    process_usage_log, to_xlsx_bytes, ForecastConfig, DEFAULT_FILE_NAME, XLSX_MIME_TYPE,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: forecast_report <usage.csv> [output.xlsx] [config.json]");
        std::process::exit(2);
    };
    let output = args.next().unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    let config = match args.next() {
        Some(path) => ForecastConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => ForecastConfig::default(),
    };

    let raw = std::fs::read(&input)?;
    let report = process_usage_log(&raw, &config)?;

    println!("Weekday baseline:");
    println!("  {}", report.baseline_headers().join(" | "));
    for weekday in report.baseline.weekdays() {
        let means: Vec<String> = (0..report.metrics.len())
            .map(|idx| format!("{:.1}", report.baseline.get(weekday, idx)))
            .collect();
        println!(
            "  {} ({} days): {}",
            weekday,
            report.baseline.observations(weekday),
            means.join(" | ")
        );
    }

    println!(
        "\n{} rows over a {}-day contract ({} observed, {} forecast)",
        report.rows.len(),
        report.contract_days,
        report.historical_rows().count(),
        report.forecast_rows().count()
    );

    if let Some(last) = report.final_row() {
        for name in &report.metrics {
            let Some(metric) = report.metric_index(name).and_then(|idx| last.metrics.get(idx)) else {
                continue;
            };
            println!(
                "{} on {}: forecast {:.0} vs quota {:.0}",
                name,
                last.formatted_date(),
                metric.cumulative_forecast,
                metric.cumulative_quota
            );
        }
    }

    std::fs::write(&output, to_xlsx_bytes(&report)?)?;
    println!("\nWrote {} ({})", output, XLSX_MIME_TYPE);

    Ok(())
}
