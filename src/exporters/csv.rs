use std::fmt::Display;

use crate::datamodel::{AggregatedSeries, KpiCatalog, KpiLabelsExt, TIMESTAMP_COLUMN, WideFrame};

/// Quote a cell when it holds a separator, a quote or a line break.
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn push_line<I, T>(output: &mut String, cells: I)
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let line = cells
        .into_iter()
        .map(|cell| escape(cell.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    output.push_str(&line);
    output.push('\n');
}

fn cell(value: Option<impl Display>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Converter for aggregation artifacts to CSV.
///
/// Timestamps are written as `YYYY-MM-DD HH:MM:SS`, missing values as empty
/// cells.
pub struct CsvConverter;

impl CsvConverter {
    pub fn series_to_csv(series: &AggregatedSeries) -> String {
        let mut output = String::new();
        push_line(
            &mut output,
            std::iter::once("timestamp".to_string()).chain(series.columns().iter().map(|c| c.to_string())),
        );
        for (timestamp, row) in series.rows() {
            push_line(
                &mut output,
                std::iter::once(timestamp.to_string()).chain(row.iter().map(|value| cell(*value))),
            );
        }
        output
    }

    pub fn frame_to_csv(frame: &WideFrame) -> String {
        let mut output = String::new();
        push_line(
            &mut output,
            std::iter::once(TIMESTAMP_COLUMN.to_string()).chain(frame.columns()),
        );
        for (timestamp, row) in frame.rows() {
            push_line(
                &mut output,
                std::iter::once(timestamp.to_string()).chain(row.iter().map(|value| cell(*value))),
            );
        }
        output
    }

    /// Tabular catalog: an unnamed index column, then one column per label
    /// name in sorted order.
    pub fn catalog_to_csv(catalog: &KpiCatalog) -> String {
        let names = catalog.label_names();
        let mut output = String::new();
        push_line(&mut output, std::iter::once("").chain(names.iter().map(String::as_str)));
        for entry in catalog.entries() {
            push_line(
                &mut output,
                std::iter::once(entry.index.to_string())
                    .chain(names.iter().map(|name| cell(entry.labels.label(name)))),
            );
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{AggColumn, KpiLabels, LabelValue, Minute, Statistic};

    #[test]
    fn test_series_to_csv() {
        let t0 = Minute::from_unix_seconds_i64(1609459200);
        let t1 = Minute::from_unix_seconds_i64(1609459260);
        let mut series = AggregatedSeries::new();
        series.push_column(
            AggColumn::scalar(1, Statistic::Mean),
            vec![(t0, Some(15.0)), (t1, Some(2.5))],
        );
        series.push_column(AggColumn::scalar(1, Statistic::Std), vec![(t0, Some(7.0)), (t1, None)]);

        assert_eq!(
            CsvConverter::series_to_csv(&series),
            "timestamp,agg-kpi-1-mean,agg-kpi-1-std\n\
             2021-01-01 00:00:00,15,7\n\
             2021-01-01 00:01:00,2.5,\n"
        );
    }

    #[test]
    fn test_catalog_to_csv() {
        let catalog = KpiCatalog::from_labels(vec![
            KpiLabels::from_pairs(vec![
                ("container", Some(LabelValue::from("a,b"))),
                ("zone", Some(LabelValue::Integer(2))),
            ]),
            KpiLabels::from_pairs(vec![("container", Some(LabelValue::from("c")))]),
        ]);
        assert_eq!(
            CsvConverter::catalog_to_csv(&catalog),
            ",container,zone\n1,\"a,b\",2\n2,c,\n"
        );
    }

    #[test]
    fn test_line_breaks_are_quoted() {
        assert_eq!(escape("a\rb"), "\"a\rb\"");
        assert_eq!(escape("a\nb"), "\"a\nb\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_frame_to_csv() {
        let frame = WideFrame::from_rows(
            vec!["lm-95%".to_string()],
            vec![(Minute::from_unix_seconds_i64(1609459200), vec![None])],
        )
        .unwrap();
        assert_eq!(
            CsvConverter::frame_to_csv(&frame),
            "timestamp,lm-95%\n2021-01-01 00:00:00,\n"
        );
    }
}
