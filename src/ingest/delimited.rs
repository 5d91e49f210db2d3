use csv::{ByteRecord, ReaderBuilder};
use std::path::Path;
use tracing::{debug, warn};

use super::{ColumnFilter, Encoding, RawTable};
use crate::error::{Error, Result};

const BOM: &str = "\u{feff}";

enum Attempt {
    Read(RawTable),
    /// Some header or cell was invalid in the encoding tried.
    Undecodable { record: u64 },
}

/// Read a CSV file, trying each encoding of `chain` in turn until one
/// decodes every kept cell. Only columns accepted by `filter` are decoded
/// and stored.
pub fn read_delimited(
    path: &Path,
    name: &str,
    chain: &[Encoding],
    filter: &dyn ColumnFilter,
) -> Result<(RawTable, Encoding)> {
    for &enc in chain {
        match read_with(path, enc, filter)? {
            Attempt::Read(table) => {
                if enc != chain[0] {
                    warn!(file = %name, encoding = %enc, "decoded with fallback encoding");
                }
                return Ok((table, enc));
            }
            Attempt::Undecodable { record } => {
                debug!(file = %name, encoding = %enc, record, "decode failed, trying next encoding");
            }
        }
    }
    Err(Error::Encoding {
        name: name.to_string(),
        tried: chain.to_vec(),
    })
}

fn read_with(path: &Path, enc: Encoding, filter: &dyn ColumnFilter) -> Result<Attempt> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let raw_headers = rdr.byte_headers()?.clone();
    let mut headers = Vec::new();
    let mut projection = Vec::new();
    for (i, field) in raw_headers.iter().enumerate() {
        let Some(text) = enc.decode(field) else {
            return Ok(Attempt::Undecodable { record: 0 });
        };
        let text: &str = if i == 0 {
            text.trim_start_matches(BOM)
        } else {
            &text
        };
        if filter.allows(text) {
            projection.push(i);
            headers.push(text.to_string());
        }
    }

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    while rdr.read_byte_record(&mut record)? {
        let mut row = Vec::with_capacity(projection.len());
        for &i in &projection {
            let cell = match record.get(i) {
                None => None,
                Some(bytes) => match enc.decode(bytes) {
                    Some(text) if text.trim().is_empty() => None,
                    Some(text) => Some(text.into_owned()),
                    None => {
                        let line = record.position().map(|p| p.line()).unwrap_or(0);
                        return Ok(Attempt::Undecodable { record: line });
                    }
                },
            };
            row.push(cell);
        }
        rows.push(row);
    }

    Ok(Attempt::Read(RawTable { headers, rows }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    struct AllowAll;
    impl ColumnFilter for AllowAll {
        fn allows(&self, _: &str) -> bool {
            true
        }
    }

    struct Only(&'static [&'static str]);
    impl ColumnFilter for Only {
        fn allows(&self, column: &str) -> bool {
            self.0.iter().any(|c| c.eq_ignore_ascii_case(column))
        }
    }

    const CHAIN: &[Encoding] = &[Encoding::Utf8, Encoding::Latin1];

    #[test]
    fn projects_allowed_columns_during_read() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        fs::write(
            &path,
            "\u{feff}Trip Id,Junk,Start Time\n1,x,2017-01-01 00:00\n2,,\n",
        )
        .unwrap();

        let (table, enc) =
            read_delimited(&path, "t.csv", CHAIN, &Only(&["trip id", "start time"])).unwrap();
        assert_eq!(enc, Encoding::Utf8);
        assert_eq!(table.headers, vec!["Trip Id", "Start Time"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Some("1".into()), Some("2017-01-01 00:00".into())],
                vec![Some("2".into()), None],
            ]
        );
    }

    #[test]
    fn falls_back_to_latin1_and_keeps_accents() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        let mut bytes = b"start station name\n".to_vec();
        bytes.extend_from_slice(b"Gen\xe8ve Park\n");
        fs::write(&path, bytes).unwrap();

        let (table, enc) = read_delimited(&path, "t.csv", CHAIN, &AllowAll).unwrap();
        assert_eq!(enc, Encoding::Latin1);
        assert_eq!(table.rows[0][0].as_deref(), Some("Genève Park"));
    }

    #[test]
    fn undecodable_under_whole_chain_is_encoding_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        fs::write(&path, b"name\n\xff\xfe\n").unwrap();

        let err = read_delimited(&path, "t.csv", &[Encoding::Utf8], &AllowAll).unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
    }

    #[test]
    fn ragged_rows_are_padded_with_none() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        fs::write(&path, "a,b,c\n1\n1,2,3,4\n").unwrap();

        let (table, _) = read_delimited(&path, "t.csv", CHAIN, &AllowAll).unwrap();
        assert_eq!(table.rows[0], vec![Some("1".into()), None, None]);
        assert_eq!(
            table.rows[1],
            vec![Some("1".into()), Some("2".into()), Some("3".into())]
        );
    }
}
