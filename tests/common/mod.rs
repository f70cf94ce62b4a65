//! Common utilities for integration tests: real `.xlsx` packages built with
//! the `zip` crate.

#![allow(dead_code)]

use rusty_table::spreadsheet::reference::index_to_reference;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Rows of cell text; empty strings are left out of the sheet.
pub type Grid = Vec<Vec<String>>;

/// Lays out a data sheet: the sheet name and `@` markers in row 1,
/// descriptions, names and types in rows 2-4, then one marked row per data
/// row and a closing marker.
pub fn data_sheet(sheet_name: &str, names: &[&str], types: &[&str], rows: &[&[&str]]) -> Grid {
    let width = names.len() + 2;
    let mut marker = vec![String::new(); width];
    marker[0] = "@".to_owned();
    marker[1] = sheet_name.to_owned();
    marker[width - 1] = "@".to_owned();

    let header = |values: Vec<String>| {
        let mut row = vec![String::new()];
        row.extend(values);
        row
    };
    let mut grid = vec![
        marker,
        header(names.iter().map(|name| format!("{name} column")).collect()),
        header(names.iter().map(|name| name.to_string()).collect()),
        header(types.iter().map(|kind| kind.to_string()).collect()),
    ];
    for values in rows {
        let mut row = vec!["@".to_owned()];
        row.extend(values.iter().map(|value| value.to_string()));
        grid.push(row);
    }
    grid.push(vec!["@".to_owned()]);
    grid
}

/// Collects worksheets and writes them as one `.xlsx` file.
#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<(String, Grid)>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, tab_name: &str, grid: Grid) -> Self {
        self.sheets.push((tab_name.to_owned(), grid));
        self
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let mut put = |name: &str, content: &str| {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        };

        put("[Content_Types].xml", &self.content_types());
        put("_rels/.rels", ROOT_RELS);
        put("xl/workbook.xml", &self.workbook());
        put("xl/_rels/workbook.xml.rels", &self.relationships());
        for (index, (_, grid)) in self.sheets.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", index + 1), &worksheet(grid));
        }
        writer.finish().unwrap();
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        for index in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        for (index, (name, _)) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(name),
                index + 1,
                index + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn relationships(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for index in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{index}.xml"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

/// Numbers are stored as numeric cells, everything else as inline strings.
fn worksheet(grid: &Grid) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row, values) in grid.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
        for (col, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let reference = index_to_reference(row, col);
            if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                xml.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(value)));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
