//! CSV export for simulation results and aggregated metrics.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::series::TimeSeries;
use crate::sim::{AggregatedMetrics, SimResults};

/// Column header for the per-timestep results table.
const HEADER: &str = "timestamp,consumption_w,production_before_storage_w,production_w,\
                       imported_w,exported_w,battery_w,battery_soc_wh";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Exports simulation curves to a CSV file at the given path.
///
/// Writes a header row followed by one data row per timestamp. Battery
/// columns are left empty when the scenario has no storage. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_results_csv(results: &SimResults, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_results_csv(results, io::BufWriter::new(file))
}

/// Writes simulation curves as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_results_csv(results: &SimResults, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    let battery = results.battery.as_ref();
    for (i, (t, consumption)) in results.total_consumption.iter().enumerate() {
        wtr.write_record(&[
            t.format(TIMESTAMP_FORMAT).to_string(),
            format!("{consumption:.4}"),
            cell(Some(&results.production_before_storage), i),
            cell(Some(&results.total_production), i),
            cell(Some(&results.imported_power), i),
            cell(Some(&results.exported_power), i),
            cell(battery.map(|b| &b.power), i),
            cell(battery.map(|b| &b.state_of_charge), i),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Value at `i` with four decimals, or an empty cell.
fn cell(series: Option<&TimeSeries>, i: usize) -> String {
    series
        .and_then(|s| s.values().get(i))
        .map_or_else(String::new, |v| format!("{v:.4}"))
}

/// Exports aggregated metrics as a one-row CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_metrics_csv(metrics: &AggregatedMetrics, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_metrics_csv(metrics, io::BufWriter::new(file))
}

/// Writes aggregated metrics as a header row plus one data row.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_metrics_csv(metrics: &AggregatedMetrics, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.serialize(metrics)?;
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioBuilder;
    use crate::sim::{simulate, summarize};
    use chrono::{NaiveDate, NaiveDateTime};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    fn make_results(hours: usize, with_battery: bool) -> SimResults {
        let consumption: Vec<f64> = (0..hours).map(|h| 2.0 + (h % 3) as f64).collect();
        let production: Vec<f64> = (0..hours).map(|h| (h % 5) as f64).collect();
        let config = ScenarioBuilder::new()
            .consumer(TimeSeries::hourly(t0(), consumption))
            .consumer_contrib(vec![1.0])
            .has_solar(true)
            .solar_scaling(false)
            .solar_curve(TimeSeries::hourly(t0(), production))
            .has_battery(with_battery)
            .battery_capacity(3.0)
            .build()
            .unwrap();
        simulate(&config).unwrap()
    }

    fn render(results: &SimResults) -> String {
        let mut buf = Vec::new();
        write_results_csv(results, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_matches_schema() {
        let output = render(&make_results(2, true));
        assert_eq!(
            output.lines().next(),
            Some(
                "timestamp,consumption_w,production_before_storage_w,production_w,\
                 imported_w,exported_w,battery_w,battery_soc_wh"
            )
        );
    }

    #[test]
    fn row_count_matches_sample_count() {
        let output = render(&make_results(24, true));
        // 1 header + 24 data rows
        assert_eq!(output.lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let results = make_results(10, true);
        assert_eq!(render(&results), render(&results));
    }

    #[test]
    fn rows_are_parseable() {
        let output = render(&make_results(3, true));
        let mut rdr = csv::ReaderBuilder::new().from_reader(output.as_bytes());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).ok(), Some(8));

        let mut row_count = 0;
        for record in rdr.records() {
            let rec = record.unwrap();
            assert!(rec[0].parse::<NaiveDateTime>().is_ok());
            for i in 1..8 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            row_count += 1;
        }
        assert_eq!(row_count, 3);
    }

    #[test]
    fn battery_columns_empty_without_storage() {
        let output = render(&make_results(2, false));
        let row = output.lines().nth(1).unwrap();
        assert!(row.ends_with(",,"));
    }

    #[test]
    fn metrics_written_as_single_row() {
        let metrics = summarize(&make_results(12, true)).unwrap();
        let mut buf = Vec::new();
        write_metrics_csv(&metrics, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("storage_use,imported_power,exported_power"));
        assert!(lines[0].ends_with("autoconsumption,autoproduction"));
        assert_eq!(lines[1].split(',').count(), 16);
    }
}
