//! Tabular (CSV) observation reader
//!
//! Reads `x,y,type,prop` records using the `csv` crate. Reference data files
//! ship without a header line, so the header is optional: a first record that
//! reads exactly `x,y,type,prop` is consumed as a header, anything else is
//! data.
//!
//! Each data row yields one `Result<Observation>`. A malformed row yields an
//! error for that row only; reading continues with the next row.

use crate::types::{EncoderError, Observation, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column names of the expected header
pub const HEADER: [&str; 4] = ["x", "y", "type", "prop"];

/// Reader over observations in a CSV source
pub struct CsvReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    checked_header: bool,
}

impl CsvReader<File> {
    /// Open a CSV file
    pub fn from_path(path: &Path) -> Result<Self> {
        log::info!("Opening observation file: {:?}", path);

        if !path.exists() {
            return Err(EncoderError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("observation file not found: {:?}", path),
            )));
        }

        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvReader<R> {
    /// Wrap any byte source
    pub fn from_reader(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();

        Self {
            records,
            checked_header: false,
        }
    }
}

fn is_header(record: &csv::StringRecord) -> bool {
    record.len() >= HEADER.len()
        && record
            .iter()
            .zip(HEADER)
            .all(|(field, name)| field.eq_ignore_ascii_case(name))
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.is_empty())
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Convert one CSV record into an observation
fn parse_record(record: &csv::StringRecord) -> Result<Observation> {
    let line = record_line(record);
    let malformed = |reason: String| EncoderError::MalformedRow { line, reason };

    if record.len() < HEADER.len() {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            record.len()
        )));
    }

    let coordinate = |index: usize| -> Result<f64> {
        let field = &record[index];
        let value: f64 = field
            .parse()
            .map_err(|_| malformed(format!("{} is not a number: {:?}", HEADER[index], field)))?;
        if !value.is_finite() {
            return Err(malformed(format!("{} is not finite: {:?}", HEADER[index], field)));
        }
        Ok(value)
    };
    let x = coordinate(0)?;
    let y = coordinate(1)?;

    let tag = |index: usize| -> Result<String> {
        let field = &record[index];
        if field.is_empty() {
            Err(malformed(format!("{} is empty", HEADER[index])))
        } else {
            Ok(field.to_string())
        }
    };

    Ok(Observation::new(x, y, tag(2)?, tag(3)?))
}

impl<R: Read> Iterator for CsvReader<R> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    let source = match e.into_kind() {
                        csv::ErrorKind::Io(source) => source,
                        other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
                    };
                    return Some(Err(EncoderError::IoError(source)));
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(EncoderError::MalformedRow {
                        line,
                        reason: e.to_string(),
                    }));
                }
            };

            if !self.checked_header {
                self.checked_header = true;
                if is_header(&record) {
                    log::debug!("Skipping header line");
                    continue;
                }
            }

            if is_blank(&record) {
                continue;
            }

            let parsed = parse_record(&record);
            if let Ok(obs) = &parsed {
                log::trace!("Row {}: {}", record_line(&record), obs);
            }
            return Some(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_all(text: &str) -> Vec<Result<Observation>> {
        CsvReader::from_reader(text.as_bytes()).collect()
    }

    /// Byte source whose every read fails
    struct DiskGone;

    impl Read for DiskGone {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_headerless_file() {
        let rows = read_all("10,20,A,red\n30,40,B,blue\n");
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.x, 10.0);
        assert_eq!(first.kind, "A");
        assert_eq!(first.prop, "red");
    }

    #[test]
    fn test_header_is_consumed() {
        let rows = read_all("x,y,type,prop\n1.5,2.5,A,red\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().y, 2.5);
    }

    #[test]
    fn test_bad_row_does_not_abort() {
        let rows = read_all("1,1,A,red\nfoo,1,A,red\n2,2\n3,3,A,red\n");
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(EncoderError::MalformedRow { line: 2, .. })
        ));
        assert!(matches!(
            rows[2],
            Err(EncoderError::MalformedRow { line: 3, .. })
        ));
        assert_eq!(rows[3].as_ref().unwrap().x, 3.0);
    }

    #[test]
    fn test_rejects_non_finite_and_empty_tags() {
        let rows = read_all("inf,1,A,red\n1,1,,red\n1,NaN,A,red\n");
        assert!(rows.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let rows = read_all("\n 1 , 2 , A , red \n\n");
        assert_eq!(rows.len(), 1);
        let obs = rows[0].as_ref().unwrap();
        assert_eq!((obs.x, obs.y), (1.0, 2.0));
        assert_eq!(obs.kind, "A");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y,type,prop").unwrap();
        writeln!(file, "5,6,A,red").unwrap();
        let rows: Vec<_> = CsvReader::from_path(file.path()).unwrap().collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_read_failure_is_io_error() {
        let mut reader = CsvReader::from_reader(DiskGone);
        match reader.next() {
            Some(Err(EncoderError::IoError(e))) => assert_eq!(e.to_string(), "disk gone"),
            other => panic!("expected IoError, got {:?}", other),
        }
        assert!(!EncoderError::IoError(std::io::Error::other("x")).is_record_error());
    }

    #[test]
    fn test_missing_file() {
        assert!(CsvReader::from_path(Path::new("does/not/exist.csv")).is_err());
    }
}
