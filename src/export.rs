use std::io;
use std::path::Path;

use crate::error::Error;
use crate::models::ResponseRow;

const HEADERS: [&str; 6] = [
    "User",
    "Email",
    "Questionnaire",
    "Status",
    "Completion %",
    "Submitted Date",
];

/// Writes filtered responses as CSV in a fixed column order. Quoting and
/// escaping of delimiters is the csv crate's job.
pub fn write_csv<W: io::Write>(rows: &[ResponseRow], writer: W) -> Result<(), Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for row in rows {
        let submitted = row
            .submitted_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Not submitted".to_string());
        let completion = format!("{}%", row.completion_percentage);
        csv_writer.write_record([
            row.username.as_str(),
            row.email.as_str(),
            row.questionnaire_title.as_str(),
            row.status.as_str(),
            completion.as_str(),
            submitted.as_str(),
        ])?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn export_to_path(rows: &[ResponseRow], path: &Path) -> Result<(), Error> {
    let file = std::fs::File::create(path).map_err(csv::Error::from)?;
    write_csv(rows, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn row(username: &str, title: &str, submitted: bool) -> ResponseRow {
        ResponseRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            questionnaire_id: Uuid::new_v4(),
            questionnaire_title: title.to_string(),
            status: if submitted {
                ResponseStatus::Completed
            } else {
                ResponseStatus::Incomplete
            },
            completion_percentage: if submitted { 100 } else { 60 },
            submitted_at: submitted.then(|| Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn fields_containing_commas_survive_a_round_trip() {
        let rows = vec![
            row("john_doe", "Skills, Experience, and Goals", true),
            row("jane_smith", "General Information Form", false),
        ];

        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let records: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][2], "Skills, Experience, and Goals");
        assert_eq!(&records[1][2], "General Information Form");
    }

    #[test]
    fn header_row_matches_the_fixed_column_order() {
        let mut buffer = Vec::new();
        write_csv(&[], &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output.lines().next().unwrap(),
            "User,Email,Questionnaire,Status,Completion %,Submitted Date"
        );
    }

    #[test]
    fn unsubmitted_responses_export_a_placeholder_date() {
        let rows = vec![row("mike_johnson", "Exit Interview", false)];

        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Not submitted"));
        assert!(output.contains("60%"));
    }

    #[test]
    fn submitted_date_uses_minute_precision() {
        let rows = vec![row("john_doe", "Exit Interview", true)];

        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("2024-01-15 10:30"));
    }
}
