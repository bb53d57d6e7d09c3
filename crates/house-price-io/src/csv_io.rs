use crate::error::{IoError, IoResult};
use house_price_core::{Column, Table};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cell texts read as missing values.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(field: &str) -> bool {
    NA_VALUES.contains(&field)
}

/// Read a CSV file with a header row into a [`Table`].
///
/// A column is numeric when every non-missing cell parses as a number,
/// otherwise it is text. Cells matching [`NA_VALUES`] are missing.
pub fn read_table(path: impl AsRef<Path>) -> IoResult<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let table = read_table_from(file, path)?;
    debug!(path = %path.display(), rows = table.n_rows(), cols = table.n_cols(), "read CSV");
    Ok(table)
}

/// Like [`read_table`], for any reader. `origin` is used in error messages.
pub fn read_table_from<R: Read>(reader: R, origin: impl AsRef<Path>) -> IoResult<Table> {
    let origin = origin.as_ref();
    let csv_err = |source| IoError::Csv {
        path: origin.to_path_buf(),
        source,
    };

    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(if is_missing(field) { None } else { Some(field.to_string()) });
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| (name, infer_column(values)))
        .collect();
    Ok(Table::from_columns(columns)?)
}

fn infer_column(values: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();
    match parsed {
        Some(numbers) => Column::Numeric(numbers),
        None => Column::Text(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use house_price_core::ColumnKind;
    use std::io::Write;

    const SAMPLE: &str = "\
Order,PID,Lot Frontage,Street,Pool QC,SalePrice
1,526301100,141,Pave,NA,215000
2,526350040,,Pave,NA,105000
3,526351010,81,Grvl,Ex,172000
";

    #[test]
    fn test_read_table_infers_kinds_and_missing() {
        let t = read_table_from(SAMPLE.as_bytes(), "sample.csv").unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_cols(), 6);
        assert_eq!(t.column("Lot Frontage").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(
            t.column("Lot Frontage").unwrap().as_numeric().unwrap(),
            &[Some(141.0), None, Some(81.0)]
        );
        let pool = t.column("Pool QC").unwrap();
        assert_eq!(pool.kind(), ColumnKind::Text);
        assert_eq!(pool.missing_count(), 2);
        assert_eq!(t.column("Street").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn test_read_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AmesHousing.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();
        let t = read_table(&path).unwrap();
        assert!(t.contains("SalePrice"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::NotFound { .. }));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let bad = "a,b\n1,2\n3\n";
        assert!(matches!(
            read_table_from(bad.as_bytes(), "bad.csv"),
            Err(IoError::Csv { .. })
        ));
    }
}
