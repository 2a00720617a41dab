use std::collections::BTreeSet;
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("export is not valid utf-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("could not finish export: {0}")]
    Flush(String),
    #[error("expected roll number {expected}, found {found}")]
    OutOfSequence { expected: u32, found: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Present,
    Absent,
}

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    #[serde(rename = "Roll Number")]
    roll: u32,
    #[serde(rename = "Status")]
    status: Status,
}

/// Roll-number attendance sheet as exported for a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSheet {
    pub expected: u32,
    pub marked: BTreeSet<u32>,
}

/// `Roll Number,Status` header, then one `roll,Present|Absent` row per roll number in
/// `1..=expected`, newline separated with no trailing newline.
pub fn attendance_csv(expected: u32, marked: &BTreeSet<u32>) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);

    if expected == 0 {
        writer.write_record(["Roll Number", "Status"])?;
    }
    for roll in 1..=expected {
        let status = if marked.contains(&roll) {
            Status::Present
        } else {
            Status::Absent
        };
        writer.serialize(Row { roll, status })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Reads a sheet written by [`attendance_csv`]. Rows must run `1, 2, 3, ...`.
pub fn read_attendance<R: Read>(reader: R) -> Result<AttendanceSheet, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sheet = AttendanceSheet {
        expected: 0,
        marked: BTreeSet::new(),
    };
    for row in reader.deserialize::<Row>() {
        let row = row?;
        let next = sheet.expected + 1;
        if row.roll != next {
            return Err(ExportError::OutOfSequence {
                expected: next,
                found: row.roll,
            });
        }
        sheet.expected = next;
        if row.status == Status::Present {
            sheet.marked.insert(row.roll);
        }
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_export_matches_legacy_format() {
        let marked: BTreeSet<u32> = [2].into_iter().collect();
        assert_eq!(
            attendance_csv(3, &marked).unwrap(),
            "Roll Number,Status\n1,Absent\n2,Present\n3,Absent"
        );
    }

    #[test]
    fn test_export_all_present() {
        let marked: BTreeSet<u32> = (1..=2).collect();
        assert_eq!(
            attendance_csv(2, &marked).unwrap(),
            "Roll Number,Status\n1,Present\n2,Present"
        );
    }

    #[test]
    fn test_export_empty_roster_is_header_only() {
        assert_eq!(
            attendance_csv(0, &BTreeSet::new()).unwrap(),
            "Roll Number,Status"
        );
    }

    #[test]
    fn test_export_ignores_marks_out_of_range() {
        let marked: BTreeSet<u32> = [1, 9].into_iter().collect();
        let csv = attendance_csv(2, &marked).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(!csv.contains('9'));
    }

    #[test]
    fn test_read_back_sheet() {
        let text = "Roll Number,Status\n1,Absent\n2,Present\n3,Absent";
        let sheet = read_attendance(text.as_bytes()).unwrap();
        assert_eq!(sheet.expected, 3);
        assert_eq!(sheet.marked, BTreeSet::from([2]));
    }

    #[test]
    fn test_read_rejects_gaps() {
        let text = "Roll Number,Status\n1,Absent\n3,Present";
        assert_matches!(
            read_attendance(text.as_bytes()),
            Err(ExportError::OutOfSequence {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_read_rejects_unknown_status() {
        let text = "Roll Number,Status\n1,Late";
        assert_matches!(read_attendance(text.as_bytes()), Err(ExportError::Csv(_)));
    }
}
