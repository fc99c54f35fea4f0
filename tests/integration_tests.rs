use chrono::{Datelike, NaiveDate};
use std::fmt::Write as _;
use usage_quota_forecaster::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Builds a usage log with a Grand Total row and a sub-segment row per day.
fn usage_log(start: NaiveDate, days: u32, visits: impl Fn(NaiveDate) -> f64) -> String {
    let mut csv = String::from("Profile,Date,Visits,All Inbound Events\n");
    for date in utils::date_run(start, days) {
        let v = visits(date);
        writeln!(csv, "Grand Total,{},{},{}", date.format("%Y-%m-%d"), v, v * 10.0).unwrap();
        writeln!(csv, "Mobile App,{},{},{}", date.format("%Y-%m-%d"), v / 2.0, v * 5.0).unwrap();
    }
    csv
}

fn visits_by_weekday(date: NaiveDate) -> f64 {
    // Monday 100, Tuesday 200, ..., Sunday 700
    f64::from(date.weekday().num_days_from_monday() + 1) * 100.0
}

#[test]
fn test_monday_busy_month_scenario() -> anyhow::Result<()> {
    // four weeks of January 2024 give a Monday mean of 100 visits
    let log = usage_log(d(2024, 1, 1), 28, visits_by_weekday);
    let config = ForecastConfig {
        busy_months: [4].into_iter().collect(),
        busy_factor: 1.5,
        ..ForecastConfig::default()
    }
    .with_horizon(ForecastHorizon::Rolling {
        start: d(2024, 4, 1),
        days: 7,
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    let april_first = &report.rows[0];
    assert_eq!(april_first.date, d(2024, 4, 1));
    assert_eq!(april_first.weekday, 0);
    assert_eq!(april_first.segment, Segment::Forecast);
    assert_eq!(april_first.seasonal_factor, 1.5);
    assert!((april_first.metrics[0].forecast - 150.0).abs() < 1e-9);
    assert!((april_first.metrics[1].forecast - 1500.0).abs() < 1e-9);
    // raw column carries the unadjusted weekday mean
    assert_eq!(april_first.metrics[0].raw, Some(100.0));
    Ok(())
}

#[test]
fn test_actuals_take_precedence_in_busy_months() -> anyhow::Result<()> {
    let log = usage_log(d(2024, 3, 1), 10, |_| 42.0);
    let config = ForecastConfig {
        busy_months: [3].into_iter().collect(),
        busy_factor: 2.0,
        ..ForecastConfig::default()
    }
    .with_horizon(ForecastHorizon::Contract {
        start: d(2024, 3, 1),
        end: d(2024, 3, 20),
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    for row in report.historical_rows() {
        assert_eq!(row.metrics[0].forecast, 42.0);
        assert_eq!(row.metrics[0].raw, Some(42.0));
    }
    for row in report.forecast_rows() {
        assert_eq!(row.metrics[0].forecast, 84.0);
    }
    assert_eq!(report.historical_rows().count(), 10);
    assert_eq!(report.forecast_rows().count(), 10);
    Ok(())
}

#[test]
fn test_quota_over_hundred_day_contract() -> anyhow::Result<()> {
    let log = usage_log(d(2024, 1, 1), 14, visits_by_weekday);
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
        start: d(2024, 1, 1),
        end: d(2024, 4, 10),
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    assert_eq!(report.contract_days, 100);
    assert_eq!(report.rows.len(), 101);

    let visits = report.metric_index("Visits").unwrap();
    assert_eq!(report.rows[0].metrics[visits].daily_quota, 100_000.0);
    assert_eq!(report.rows[99].metrics[visits].cumulative_quota, 10_000_000.0);
    assert_eq!(report.rows[100].metrics[visits].cumulative_quota, 10_000_000.0);

    let events = report.metric_index("All Inbound Events").unwrap();
    assert_eq!(report.rows[0].metrics[events].daily_quota, 250_000.0);
    assert_eq!(report.rows[100].metrics[events].cumulative_quota, 25_000_000.0);
    Ok(())
}

#[test]
fn test_cumulative_quota_monotonic_and_capped() -> anyhow::Result<()> {
    let log = usage_log(d(2023, 6, 1), 60, visits_by_weekday);
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
        start: d(2023, 6, 1),
        end: d(2024, 5, 31),
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    for (idx, quota) in config.metrics.iter().enumerate() {
        let series: Vec<f64> = report.rows.iter().map(|r| r.metrics[idx].cumulative_quota).collect();
        assert!(series.windows(2).all(|w| w[1] >= w[0]));
        assert!(series.iter().all(|v| *v <= quota.annual_volume));
        assert_eq!(*series.last().unwrap(), quota.annual_volume);

        let forecast: Vec<f64> = report.rows.iter().map(|r| r.metrics[idx].forecast).collect();
        let expected = cumulative_sum(&forecast);
        let actual: Vec<f64> = report
            .rows
            .iter()
            .map(|r| r.metrics[idx].cumulative_forecast)
            .collect();
        assert_eq!(actual, expected);
    }
    Ok(())
}

#[test]
fn test_zero_length_contract_is_configuration_error() {
    let log = usage_log(d(2024, 1, 1), 7, visits_by_weekday);
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
        start: d(2024, 5, 1),
        end: d(2024, 5, 1),
    });

    let err = process_usage_log(log.as_bytes(), &config).unwrap_err();
    assert!(matches!(err, UsageForecastError::InvalidContractDays(0)));
    assert!(QuotaTracker::new(0, &config.metrics).is_err());
}

#[test]
fn test_one_unparseable_date_in_ten_rows() -> anyhow::Result<()> {
    let mut log = String::from("Profile,Date,Visits,All Inbound Events\n");
    for day in 1..=10 {
        let date = if day == 5 {
            "2024-13-45".to_string()
        } else {
            format!("2024-01-{:02}", day)
        };
        writeln!(log, "Grand Total,{},{},{}", date, day * 10, day * 100)?;
    }

    let input = ingest(
        log.as_bytes(),
        "Profile",
        "Grand Total",
        "Date",
        &ForecastConfig::default().metric_columns(),
    )?;
    assert_eq!(input.table.len(), 10);

    let history = enrich(&input.table, "Date", &ForecastConfig::default().metric_columns(), None)?;
    assert_eq!(history.len(), 9);
    assert!(history.record_on(d(2024, 1, 5)).is_none());

    // the full pipeline still succeeds
    let report = process_usage_log(log.as_bytes(), &ForecastConfig::default())?;
    assert_eq!(report.historical_rows().count(), 9);
    Ok(())
}

#[test]
fn test_missing_metric_column_is_fatal() {
    let log = "Profile,Date,Visits\nGrand Total,2024-01-01,10\nGrand Total,2024-01-02,10\n";
    let err = process_usage_log(log.as_bytes(), &ForecastConfig::default()).unwrap_err();
    match err {
        UsageForecastError::MissingColumns(cols) => {
            assert_eq!(cols, vec!["All Inbound Events".to_string()])
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_date_column_is_fatal() {
    let log = "Profile,Day,Visits,All Inbound Events\nGrand Total,2024-01-01,10,20\n";
    let err = process_usage_log(log.as_bytes(), &ForecastConfig::default()).unwrap_err();
    assert!(matches!(err, UsageForecastError::MissingColumns(ref c) if c == &vec!["Date".to_string()]));
}

#[test]
fn test_no_grand_total_rows_is_fatal() {
    let log = "Profile,Date,Visits,All Inbound Events\nMobile App,2024-01-01,10,20\n";
    let err = process_usage_log(log.as_bytes(), &ForecastConfig::default()).unwrap_err();
    assert!(matches!(err, UsageForecastError::NoProfileRows { .. }));
}

#[test]
fn test_shift_jis_upload() -> anyhow::Result<()> {
    let log = "Profile,Date,Visits,All Inbound Events,メモ\n\
        Grand Total,2024/01/01,10,100,月曜\n\
        Grand Total,2024/01/02,20,200,火曜\n\
        Grand Total,2024/01/03,30,300,水曜\n";
    let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode(log);

    let report = process_usage_log(&encoded, &ForecastConfig::default())?;
    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.final_row().unwrap().metrics[0].cumulative_forecast, 60.0);
    Ok(())
}

#[test]
fn test_malformed_lines_do_not_abort() -> anyhow::Result<()> {
    let log = "Profile,Date,Visits,All Inbound Events\n\
        Grand Total,2024-01-01,10,100\n\
        Grand Total,2024-01-02,20,200,unexpected\n\
        Grand Total,2024-01-03,30,300\n";
    let report = process_usage_log(log.as_bytes(), &ForecastConfig::default())?;
    assert_eq!(report.historical_rows().count(), 2);
    Ok(())
}

#[test]
fn test_pipeline_is_deterministic() -> anyhow::Result<()> {
    let log = usage_log(d(2024, 1, 1), 45, visits_by_weekday);
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Rolling {
        start: d(2024, 2, 1),
        days: 365,
    });

    let first = process_usage_log(log.as_bytes(), &config)?;
    let second = process_usage_log(log.as_bytes(), &config)?;
    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    assert_eq!(to_xlsx_bytes(&first)?.len(), to_xlsx_bytes(&second)?.len());

    let mut csv_first = Vec::new();
    let mut csv_second = Vec::new();
    write_csv(&first, &mut csv_first)?;
    write_csv(&second, &mut csv_second)?;
    assert_eq!(csv_first, csv_second);
    Ok(())
}

#[test]
fn test_profile_filter_idempotent_on_upload() -> anyhow::Result<()> {
    let log = usage_log(d(2024, 1, 1), 5, visits_by_weekday);
    let table = UsageTable::parse(&log)?;
    let once = table.filter_profile("Profile", "Grand Total")?;
    let twice = once.filter_profile("Profile", "Grand Total")?;
    assert_eq!(once.len(), 5);
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_report_export() -> anyhow::Result<()> {
    let log = usage_log(d(2024, 1, 1), 14, visits_by_weekday);
    let report = process_usage_log(log.as_bytes(), &ForecastConfig::default())?;

    let xlsx = to_xlsx_bytes(&report)?;
    assert_eq!(&xlsx[..2], b"PK");
    assert_eq!(
        XLSX_MIME_TYPE,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let mut csv = Vec::new();
    write_csv(&report, &mut csv)?;
    let text = String::from_utf8(csv)?;
    assert_eq!(text.lines().count(), report.rows.len() + 1);
    assert!(text.lines().nth(1).unwrap().starts_with("0,2024/01/01,100,"));
    Ok(())
}

#[test]
fn test_baseline_keys_within_week() -> anyhow::Result<()> {
    // weekdays only: no Saturday or Sunday rows
    let mut log = String::from("Profile,Date,Visits,All Inbound Events\n");
    for date in utils::date_run(d(2024, 1, 1), 21) {
        if date.weekday().num_days_from_monday() < 5 {
            writeln!(log, "Grand Total,{},50,500", date)?;
        }
    }

    let report = process_usage_log(log.as_bytes(), &ForecastConfig::default())?;
    let weekdays: Vec<u32> = report.baseline.weekdays().collect();
    assert_eq!(weekdays, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.baseline.get(5, 0), 0.0);
    assert_eq!(report.baseline.get(6, 1), 0.0);
    Ok(())
}

#[test]
fn test_unobserved_weekday_has_blank_raw_value() -> anyhow::Result<()> {
    // Mondays of January 2024 only
    let mut log = String::from("Profile,Date,Visits,All Inbound Events\n");
    for date in [d(2024, 1, 1), d(2024, 1, 8), d(2024, 1, 15), d(2024, 1, 22)] {
        writeln!(log, "Grand Total,{},100,1000", date)?;
    }
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Rolling {
        start: d(2024, 2, 4),
        days: 2,
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    let sunday = &report.rows[0];
    assert_eq!(sunday.weekday, 6);
    assert_eq!(sunday.segment, Segment::Forecast);
    assert_eq!(sunday.metrics[0].raw, None);
    assert_eq!(sunday.metrics[0].forecast, 0.0);
    assert_eq!(report.row_cells(sunday)[2], ReportCell::Empty);

    let monday = &report.rows[1];
    assert_eq!(monday.metrics[0].raw, Some(100.0));
    assert_eq!(monday.metrics[0].forecast, 100.0);
    Ok(())
}

#[test]
fn test_duplicate_date_rows_fill_each_other() -> anyhow::Result<()> {
    let log = "Profile,Date,Visits,All Inbound Events\n\
               Grand Total,2024-01-01,,1000\n\
               Grand Total,2024-01-01,500,1000\n\
               Grand Total,2024-01-02,300,3000\n";
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
        start: d(2024, 1, 1),
        end: d(2024, 1, 2),
    });

    let report = process_usage_log(log.as_bytes(), &config)?;
    assert_eq!(report.rows.len(), 2);
    let first = &report.rows[0];
    assert_eq!(first.segment, Segment::Historical);
    assert_eq!(first.metrics[0].raw, Some(500.0));
    assert_eq!(first.metrics[0].forecast, 500.0);
    assert_eq!(first.metrics[1].raw, Some(1000.0));
    assert_eq!(report.final_row().unwrap().metrics[0].cumulative_forecast, 800.0);
    Ok(())
}

#[test]
fn test_overlong_contract_is_rejected() {
    let log = usage_log(d(2024, 1, 1), 7, visits_by_weekday);
    let config = ForecastConfig::default().with_horizon(ForecastHorizon::Contract {
        start: d(2024, 1, 1),
        end: d(9999, 12, 31),
    });

    assert!(matches!(
        process_usage_log(log.as_bytes(), &config),
        Err(UsageForecastError::InvalidHorizon(_))
    ));
}
