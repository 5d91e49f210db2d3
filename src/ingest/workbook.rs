use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

use super::{ColumnFilter, RawTable};
use crate::error::Result;

/// Read every sheet of an xlsx/xls workbook into one table, sheet order
/// first, then row order within each sheet. The first row of each sheet is
/// its header; sheets without one are ignored.
pub fn read_workbook(path: &Path, name: &str, filter: &dyn ColumnFilter) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let mut table = RawTable::default();

    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet)?;
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            debug!(file = %name, sheet = %sheet, "empty sheet");
            continue;
        };

        let mut headers = Vec::new();
        let mut projection = Vec::new();
        for (i, cell) in header.iter().enumerate() {
            if let Some(h) = cell_text(cell) {
                if filter.allows(&h) {
                    projection.push(i);
                    headers.push(h);
                }
            }
        }

        let block: Vec<Vec<Option<String>>> = rows
            .map(|row| {
                projection
                    .iter()
                    .map(|&i| row.get(i).and_then(cell_text))
                    .collect()
            })
            .collect();
        debug!(file = %name, sheet = %sheet, rows = block.len(), columns = headers.len(), "sheet read");
        table.append(headers, block);
    }

    Ok(table)
}

/// Render a cell the way a CSV export of the sheet would.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(float_text(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(float_text(dt.as_f64())),
        },
    }
}

/// Whole floats print without a fractional part, so station id `7000.0`
/// reads back as `7000`.
fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::zip_of;
    use calamine::CellErrorType;

    struct AllowAll;
    impl ColumnFilter for AllowAll {
        fn allows(&self, _: &str) -> bool {
            true
        }
    }

    struct TripColumns;
    impl ColumnFilter for TripColumns {
        fn allows(&self, header: &str) -> bool {
            matches!(header, "trip id" | "start station id")
        }
    }

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet3.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

    const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Q1" sheetId="1" r:id="rId1"/>
<sheet name="Q2" sheetId="2" r:id="rId2"/>
<sheet name="Blank" sheetId="3" r:id="rId3"/>
</sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet3.xml"/>
</Relationships>"#;

    fn text(cell: &str, v: &str) -> String {
        format!(r#"<c r="{cell}" t="inlineStr"><is><t>{v}</t></is></c>"#)
    }

    fn number(cell: &str, v: &str) -> String {
        format!(r#"<c r="{cell}"><v>{v}</v></c>"#)
    }

    fn sheet(rows: &[Vec<String>]) -> String {
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| format!(r#"<row r="{}">{}</row>"#, i + 1, cells.concat()))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{body}</sheetData></worksheet>"#
        )
    }

    /// Two populated sheets with the columns in different orders, then an
    /// empty one.
    fn two_quarter_workbook() -> Vec<u8> {
        let q1 = sheet(&[
            vec![text("A1", "trip id"), text("B1", "start station id"), text("C1", "notes")],
            vec![number("A2", "1"), number("B2", "7001"), text("C2", "first")],
            vec![number("A3", "2"), number("B3", "7002"), text("C3", "second")],
        ]);
        let q2 = sheet(&[
            vec![text("A1", "notes"), text("B1", "start station id"), text("C1", "trip id")],
            vec![text("A2", "third"), number("B2", "7003"), number("C2", "3")],
        ]);
        let blank = sheet(&[]);
        zip_of(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("xl/workbook.xml", WORKBOOK.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/worksheets/sheet1.xml", q1.as_bytes()),
            ("xl/worksheets/sheet2.xml", q2.as_bytes()),
            ("xl/worksheets/sheet3.xml", blank.as_bytes()),
        ])
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn sheets_are_read_in_order_and_projected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Bike Share Toronto Ridership_Q1 Q2 2017.xlsx");
        std::fs::write(&path, two_quarter_workbook()).unwrap();

        let table = read_workbook(&path, "ridership.xlsx", &TripColumns).unwrap();
        assert_eq!(table.headers, vec!["trip id", "start station id"]);
        assert_eq!(
            table.rows,
            vec![
                vec![s("1"), s("7001")],
                vec![s("2"), s("7002")],
                vec![s("3"), s("7003")],
            ]
        );
    }

    #[test]
    fn unfiltered_sheets_union_their_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ridership.xlsx");
        std::fs::write(&path, two_quarter_workbook()).unwrap();

        let table = read_workbook(&path, "ridership.xlsx", &AllowAll).unwrap();
        assert_eq!(table.headers, vec!["trip id", "start station id", "notes"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2], vec![s("3"), s("7003"), s("third")]);
    }

    #[test]
    fn renders_cells_like_a_csv_export() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Error(CellErrorType::NA)), None);
        assert_eq!(cell_text(&Data::String("  ".into())), None);
        assert_eq!(
            cell_text(&Data::String("Bay St / Bloor St".into())).as_deref(),
            Some("Bay St / Bloor St")
        );
        assert_eq!(cell_text(&Data::Int(7021)).as_deref(), Some("7021"));
        assert_eq!(cell_text(&Data::Float(7021.0)).as_deref(), Some("7021"));
        assert_eq!(cell_text(&Data::Float(12.5)).as_deref(), Some("12.5"));
        assert_eq!(
            cell_text(&Data::DateTimeIso("2017-01-01T00:03:00".into())).as_deref(),
            Some("2017-01-01T00:03:00")
        );
    }

    #[test]
    fn missing_workbook_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(read_workbook(&path, "nope.xlsx", &AllowAll).is_err());
    }
}
