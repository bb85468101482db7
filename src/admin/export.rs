//! Consistency report files and data-export downloads

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::admin::{ConsistencyDetail, ConsistencyReport, Dimensions, ReportedValues};
use crate::api::ExportFormat;
use crate::core::error::Result;

pub const CSV_COLUMNS: [&str; 16] = [
    "audio_file",
    "v_consistent",
    "a_consistent",
    "emotion_type_consistent",
    "discrete_consistent",
    "patient_consistent",
    "user_v_value",
    "user_a_value",
    "user_emotion_type",
    "user_discrete_emotion",
    "user_patient_status",
    "standard_v_value",
    "standard_a_value",
    "standard_emotion_type",
    "standard_discrete_emotion",
    "standard_patient_status",
];

/// Quote a field when it holds a comma, quote or line break
pub fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Missing and null values are empty fields
fn value_text(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn reported(values: &ReportedValues) -> [String; 5] {
    [
        value_text(&values.v_value),
        value_text(&values.a_value),
        value_text(&values.emotion_type),
        value_text(&values.discrete_emotion),
        value_text(&values.patient_status),
    ]
}

fn csv_row(detail: &ConsistencyDetail) -> String {
    let mut fields: Vec<String> = Vec::with_capacity(CSV_COLUMNS.len());
    fields.push(detail.audio_file.clone());
    for flag in [
        detail.v_consistent,
        detail.a_consistent,
        detail.emotion_type_consistent,
        detail.discrete_consistent,
        detail.patient_consistent,
    ] {
        fields.push(yes_no(flag).to_string());
    }
    fields.extend(reported(&detail.user_values));
    fields.extend(reported(&detail.standard_values));

    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header plus one line per detailed result
pub fn consistency_csv(report: &ConsistencyReport) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');
    for detail in &report.detailed_results {
        out.push_str(&csv_row(detail));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    username: &'a str,
    export_time: String,
    total_samples: u64,
    overall_consistency: f64,
    consistency_scores: &'a Dimensions<u64>,
    consistency_percentages: &'a Dimensions<f64>,
    detailed_results: &'a [ConsistencyDetail],
}

pub fn consistency_json(report: &ConsistencyReport, exported_at: DateTime<Utc>) -> Result<String> {
    let doc = JsonReport {
        username: &report.username,
        export_time: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        total_samples: report.total_samples,
        overall_consistency: report.overall_consistency,
        consistency_scores: &report.consistency_scores,
        consistency_percentages: &report.consistency_percentages,
        detailed_results: &report.detailed_results,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// `consistency_report_<user>_<YYYY-MM-DD>.<ext>`
pub fn report_filename(username: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "consistency_report_{}_{}.{}",
        username,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Write a report into `dir`; returns the file path
pub fn write_report(report: &ConsistencyReport, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
    let now = Utc::now();
    let content = match format {
        ExportFormat::Csv => consistency_csv(report),
        ExportFormat::Json => consistency_json(report, now)?,
    };
    let path = dir.join(report_filename(&report.username, format, now.date_naive()));
    save_bytes(&path, content.as_bytes())?;
    info!(path = %path.display(), rows = report.detailed_results.len(), "consistency report written");
    Ok(path)
}

/// Write downloaded bytes, creating the directory when needed
pub fn save_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn detail(file: &str, consistent: bool) -> ConsistencyDetail {
        ConsistencyDetail {
            audio_file: file.to_string(),
            v_consistent: consistent,
            a_consistent: true,
            emotion_type_consistent: true,
            discrete_consistent: consistent,
            patient_consistent: true,
            user_values: ReportedValues {
                v_value: Some(Value::from(0.0)),
                a_value: Some(Value::from(3.5)),
                emotion_type: Some(Value::from("non-neutral")),
                discrete_emotion: Some(Value::from("anger, mild")),
                patient_status: None,
            },
            standard_values: ReportedValues {
                v_value: Some(Value::from(-1)),
                discrete_emotion: Some(Value::Null),
                ..Default::default()
            },
        }
    }

    fn report(rows: usize) -> ConsistencyReport {
        ConsistencyReport {
            username: "alice".to_string(),
            total_samples: rows as u64,
            overall_consistency: 80.0,
            detailed_results: (0..rows).map(|i| detail(&format!("s{}.wav", i), i % 2 == 0)).collect(),
            ..Default::default()
        }
    }

    /// Split one line honouring quoted fields
    fn split_csv(line: &str) -> Vec<String> {
        let mut fields = vec![String::new()];
        let mut quoted = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if quoted && chars.peek() == Some(&'"') => {
                    chars.next();
                    fields.last_mut().unwrap().push('"');
                }
                '"' => quoted = !quoted,
                ',' if !quoted => fields.push(String::new()),
                other => fields.last_mut().unwrap().push(other),
            }
        }
        fields
    }

    #[test]
    fn test_csv_has_header_plus_one_line_per_row() {
        let csv = consistency_csv(&report(3));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert_eq!(split_csv(line).len(), 16, "{}", line);
        }
        assert_eq!(split_csv(lines[0])[10], "user_patient_status");
    }

    #[test]
    fn test_csv_field_values() {
        let csv = consistency_csv(&report(1));
        let row = split_csv(csv.lines().nth(1).unwrap());
        assert_eq!(row[0], "s0.wav");
        assert_eq!(row[1], "yes");
        assert_eq!(row[6], "0.0");
        assert_eq!(row[9], "anger, mild");
        assert_eq!(row[10], "");
        assert_eq!(row[11], "-1");
        assert_eq!(row[14], "");
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_empty_report_is_header_only() {
        assert_eq!(consistency_csv(&report(0)).lines().count(), 1);
    }

    #[test]
    fn test_json_export_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let json = consistency_json(&report(2), at).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["export_time"], "2024-05-06T07:08:09.000Z");
        assert_eq!(value["total_samples"], 2);
        assert_eq!(value["detailed_results"].as_array().unwrap().len(), 2);
        assert!(value["consistency_scores"]["v_value"].is_number());
        assert!(json.contains("\n  "));
    }

    #[test]
    fn test_report_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            report_filename("alice", ExportFormat::Csv, date),
            "consistency_report_alice_2024-01-02.csv"
        );
        assert_eq!(
            report_filename("bob", ExportFormat::Json, date),
            "consistency_report_bob_2024-01-02.json"
        );
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = write_report(&report(2), ExportFormat::Csv, &dir.path().join("out")).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("consistency_report_alice_"));
    }
}
