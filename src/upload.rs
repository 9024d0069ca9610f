use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{MonthlyComment, TimeSeriesPoint};

pub const TEMPLATE_HEADER: [&str; 10] = [
    "Month",
    "NPS Score",
    "NPS Respondents",
    "Jira Score",
    "Jira Respondents",
    "Project Score",
    "Project Respondents",
    "Adhoc Score",
    "Adhoc Respondents",
    "Comments",
];

const TEMPLATE_EXAMPLE: [&str; 10] = [
    "Jan", "42", "120", "4.2", "85", "4.0", "22", "4.3", "37", "Replace with your own data",
];

const MIN_COLUMNS: usize = 8;
const MONTH: usize = 0;
const NPS: (usize, usize) = (1, 2);
const JIRA: (usize, usize) = (3, 4);
const PROJECT: (usize, usize) = (5, 6);
const ADHOC: (usize, usize) = (7, 8);
const COMMENTS: usize = 9;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read spreadsheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read spreadsheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("spreadsheet is empty")]
    Empty,
    #[error("row {row}: {column} value {value:?} is not valid")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Monthly series extracted from an uploaded sheet, in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedUpload {
    pub nps: Vec<TimeSeriesPoint>,
    pub jira: Vec<TimeSeriesPoint>,
    pub project: Vec<TimeSeriesPoint>,
    pub adhoc: Vec<TimeSeriesPoint>,
    pub comments: Vec<MonthlyComment>,
    pub skipped_rows: usize,
}

impl ParsedUpload {
    pub fn month_count(&self) -> usize {
        self.nps.len()
    }
}

pub fn parse_file(path: &Path) -> Result<ParsedUpload, UploadError> {
    let file = std::fs::File::open(path)?;
    let upload = parse_rows(file)?;
    info!(
        path = %path.display(),
        months = upload.month_count(),
        skipped = upload.skipped_rows,
        "parsed upload"
    );
    Ok(upload)
}

/// Parses the whole sheet before returning, so a bad cell anywhere rejects
/// the upload without partial results.
pub fn parse_rows<R: Read>(reader: R) -> Result<ParsedUpload, UploadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut upload = ParsedUpload::default();
    let mut saw_header = false;

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        if index == 0 {
            saw_header = true;
            continue;
        }
        let row = index + 1;

        let month = cell(&record, MONTH);
        if record.len() < MIN_COLUMNS || month.is_empty() || cell(&record, NPS.0).is_empty() {
            debug!(row, "skipping incomplete row");
            upload.skipped_rows += 1;
            continue;
        }

        let columns = [
            (NPS, &mut upload.nps),
            (JIRA, &mut upload.jira),
            (PROJECT, &mut upload.project),
            (ADHOC, &mut upload.adhoc),
        ];
        for ((score_col, respondents_col), series) in columns {
            if let Some(point) = parse_point(&record, row, month, score_col, respondents_col)? {
                series.push(point);
            }
        }

        let comment = cell(&record, COMMENTS);
        if !comment.is_empty() {
            upload.comments.push(MonthlyComment {
                month: month.to_string(),
                comment: comment.to_string(),
            });
        }
    }

    if !saw_header {
        return Err(UploadError::Empty);
    }

    Ok(upload)
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn parse_point(
    record: &StringRecord,
    row: usize,
    month: &str,
    score_col: usize,
    respondents_col: usize,
) -> Result<Option<TimeSeriesPoint>, UploadError> {
    let raw_score = cell(record, score_col);
    if raw_score.is_empty() {
        return Ok(None);
    }

    let score = raw_score
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| UploadError::InvalidNumber {
            row,
            column: TEMPLATE_HEADER[score_col],
            value: raw_score.to_string(),
        })?;

    let raw_respondents = cell(record, respondents_col);
    let respondents = if raw_respondents.is_empty() {
        None
    } else {
        let count = raw_respondents
            .parse::<u32>()
            .ok()
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(|| UploadError::InvalidNumber {
                row,
                column: TEMPLATE_HEADER[respondents_col],
                value: raw_respondents.to_string(),
            })?;
        Some(count)
    };

    Ok(Some(TimeSeriesPoint {
        month: month.to_string(),
        score,
        respondents,
    }))
}

pub fn write_template<W: Write>(writer: W) -> Result<(), UploadError> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(TEMPLATE_HEADER)?;
    writer.write_record(TEMPLATE_EXAMPLE)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Month,NPS Score,NPS Respondents,Jira Score,Jira Respondents,Project Score,Project Respondents,Adhoc Score,Adhoc Respondents,Comments\n";

    #[test]
    fn parses_rows_after_header() {
        let sheet = format!(
            "{HEADER}Jan,40,100,4.1,80,3.9,20,4.2,30,Strong start\nFeb,45,110,4.3,82,4.0,21,4.4,,\n"
        );
        let upload = parse_rows(sheet.as_bytes()).expect("upload");

        assert_eq!(upload.nps.len(), 2);
        assert_eq!(upload.nps[1], TimeSeriesPoint::new("Feb", 45.0).with_respondents(110));
        assert_eq!(upload.jira[0].score, 4.1);
        assert_eq!(upload.project[1].respondents, Some(21));
        assert_eq!(upload.adhoc[1].respondents, None);
        assert_eq!(upload.comments.len(), 1);
        assert_eq!(upload.comments[0].comment, "Strong start");
        assert_eq!(upload.skipped_rows, 0);
    }

    #[test]
    fn skips_short_and_blank_rows() {
        let sheet = format!(
            "{HEADER}Jan,40,100,4.1,80,3.9,20\n,41,100,4.1,80,3.9,20,4.0,10\nMar,,100,4.1,80,3.9,20,4.0,10\nApr,44,100,4.1,80,3.9,20,4.0,10\n"
        );
        let upload = parse_rows(sheet.as_bytes()).expect("upload");
        assert_eq!(upload.skipped_rows, 3);
        assert_eq!(upload.nps.len(), 1);
        assert_eq!(upload.nps[0].month, "Apr");
    }

    #[test]
    fn blank_metric_cell_omits_only_that_point() {
        let sheet = format!("{HEADER}Jan,40,100,,,3.9,20,4.0,10\n");
        let upload = parse_rows(sheet.as_bytes()).expect("upload");
        assert_eq!(upload.nps.len(), 1);
        assert!(upload.jira.is_empty());
        assert_eq!(upload.project.len(), 1);
    }

    #[test]
    fn rejects_non_numeric_scores() {
        let sheet = format!("{HEADER}Jan,40,100,4.1,80,3.9,20,4.0,10\nFeb,great,100,4.1,80,3.9,20,4.0,10\n");
        let err = parse_rows(sheet.as_bytes()).unwrap_err();
        match err {
            UploadError::InvalidNumber { row, column, value } => {
                assert_eq!(row, 3);
                assert_eq!(column, "NPS Score");
                assert_eq!(value, "great");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn respondent_counts_must_be_whole_numbers() {
        for (cells, column, value) in [
            ("40,1e12,4.1,80", "NPS Respondents", "1e12"),
            ("40,100,4.1,12.6", "Jira Respondents", "12.6"),
            ("40,-3,4.1,80", "NPS Respondents", "-3"),
            ("40,3000000000,4.1,80", "NPS Respondents", "3000000000"),
        ] {
            let sheet = format!("{HEADER}Jan,{cells},3.9,20,4.0,10\n");
            match parse_rows(sheet.as_bytes()) {
                Err(UploadError::InvalidNumber {
                    row,
                    column: bad_column,
                    value: bad_value,
                }) => {
                    assert_eq!(row, 2);
                    assert_eq!(bad_column, column);
                    assert_eq!(bad_value, value);
                }
                other => panic!("expected invalid {column}, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_rows("".as_bytes()), Err(UploadError::Empty)));
    }

    #[test]
    fn template_parses_back_into_one_month() {
        let mut buffer = Vec::new();
        write_template(&mut buffer).expect("template");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.starts_with("Month,NPS Score"));

        let upload = parse_rows(text.as_bytes()).expect("upload");
        assert_eq!(upload.month_count(), 1);
        assert_eq!(upload.adhoc[0].score, 4.3);
    }
}
