//! CSV ingestion into dataset records.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::domain::dataset::{CellValue, Record};
use crate::domain::error::AnalystError;

/// Parse CSV bytes with a header row. Records keep row order and each record
/// keeps header order. A repeated header becomes `name.1`, `name.2`, ...
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>, AnalystError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = rdr
        .headers()
        .map_err(|e| AnalystError::Csv {
            reason: format!("CSV parse error: {}", e),
        })?
        .clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(AnalystError::Csv {
            reason: "CSV file is empty".into(),
        });
    }

    let headers = dedupe_headers(&headers);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| AnalystError::Csv {
            reason: format!("CSV parse error: {}", e),
        })?;
        let record = headers
            .iter()
            .zip(row.iter())
            .fold(Record::new(), |record, (key, cell)| {
                record.with(key.as_str(), infer_cell(cell))
            });
        records.push(record);
    }

    Ok(records)
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, AnalystError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    parse_records(&bytes)
}

fn dedupe_headers(raw: &csv::StringRecord) -> Vec<String> {
    let mut taken: HashSet<String> = raw.iter().map(str::to_string).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut suffixes: HashMap<&str, usize> = HashMap::new();

    raw.iter()
        .map(|name| {
            if seen.insert(name) {
                return name.to_string();
            }
            let next = suffixes.entry(name).or_insert(0);
            loop {
                *next += 1;
                let candidate = format!("{name}.{next}");
                if taken.insert(candidate.clone()) {
                    tracing::warn!(column = name, renamed = %candidate, "duplicate CSV header");
                    return candidate;
                }
            }
        })
        .collect()
}

fn infer_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_header_order_and_types() {
        let records =
            parse_records(b"mes,ingresos,nota\nenero,100.5,\nfebrero,120,ok\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].columns().collect::<Vec<_>>(),
            vec!["mes", "ingresos", "nota"]
        );
        assert_eq!(
            records[0].get("mes"),
            Some(&CellValue::Text("enero".to_string()))
        );
        assert_eq!(records[0].get("ingresos"), Some(&CellValue::Number(100.5)));
        assert_eq!(records[0].get("nota"), Some(&CellValue::Null));
        assert_eq!(records[1].get("ingresos"), Some(&CellValue::Number(120.0)));
    }

    #[test]
    fn trims_cells() {
        let records = parse_records(b"a , b\n 1 , x \n").unwrap();
        assert_eq!(records[0].get("a"), Some(&CellValue::Number(1.0)));
        assert_eq!(records[0].get("b"), Some(&CellValue::Text("x".to_string())));
    }

    #[test]
    fn non_finite_text_stays_text() {
        let records = parse_records(b"v\nNaN\ninf\n").unwrap();
        assert!(matches!(records[0].get("v"), Some(CellValue::Text(_))));
        assert!(matches!(records[1].get("v"), Some(CellValue::Text(_))));
    }

    #[test]
    fn duplicate_headers_keep_every_column() {
        let records = parse_records(b"ingresos,ingresos\n1,2\n3,4\n").unwrap();
        assert_eq!(
            records[0].columns().collect::<Vec<_>>(),
            vec!["ingresos", "ingresos.1"]
        );
        assert_eq!(records[0].get("ingresos"), Some(&CellValue::Number(1.0)));
        assert_eq!(records[1].get("ingresos.1"), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn renamed_duplicate_skips_existing_names() {
        let records = parse_records(b"a,a,a.1\n1,2,3\n").unwrap();
        assert_eq!(
            records[0].columns().collect::<Vec<_>>(),
            vec!["a", "a.2", "a.1"]
        );
        assert_eq!(records[0].get("a.1"), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn header_only_yields_no_records() {
        assert!(parse_records(b"a,b\n").unwrap().is_empty());
    }

    #[test]
    fn empty_input_is_error() {
        let err = parse_records(b"").unwrap_err();
        assert_eq!(err.to_string(), "CSV error: CSV file is empty");
    }

    #[test]
    fn ragged_rows_are_error() {
        let err = parse_records(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, AnalystError::Csv { .. }));
    }

    #[test]
    fn invalid_utf8_is_error() {
        let err = parse_records(b"a\n\xff\xfe\n").unwrap_err();
        assert!(matches!(err, AnalystError::Csv { .. }));
    }

    #[test]
    fn load_file_reads_disk() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ingresos\n10\n20\n").unwrap();
        let records = load_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_file("/nonexistent/data.csv").unwrap_err();
        assert!(matches!(err, AnalystError::Io(_)));
    }
}
