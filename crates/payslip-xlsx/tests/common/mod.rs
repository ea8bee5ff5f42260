//! In-memory XLSX fixtures.
//!
//! Builds the handful of parts the reader looks at, so tests can describe a
//! payroll sheet as raw `<sheetData>` XML.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

/// Style 0 is General, style 1 is a built-in date format
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

/// A workbook with a payroll sheet first and a decoy sheet second
pub struct WorkbookFixture {
    pub sheet_name: String,
    pub shared_strings: Vec<String>,
    pub sheet_data: String,
    pub merges: Vec<String>,
    pub date1904: bool,
}

impl WorkbookFixture {
    pub fn new(sheet_data: &str) -> Self {
        Self {
            sheet_name: "Payroll".to_string(),
            shared_strings: Vec::new(),
            sheet_data: sheet_data.to_string(),
            merges: Vec::new(),
            date1904: false,
        }
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();

            let mut part = |name: &str, body: &str| {
                zip.start_file(name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            };

            part("[Content_Types].xml", CONTENT_TYPES);
            part("xl/workbook.xml", &self.workbook_xml());
            part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS);
            part("xl/styles.xml", STYLES);
            part("xl/sharedStrings.xml", &self.shared_strings_xml());
            part("xl/worksheets/sheet1.xml", &self.worksheet_xml());
            part(
                "xl/worksheets/sheet2.xml",
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>decoy</t></is></c></row></sheetData></worksheet>"#,
            );

            zip.finish().unwrap();
        }
        buf
    }

    fn workbook_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="{}"/><sheets><sheet name="{}" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#,
            if self.date1904 { 1 } else { 0 },
            self.sheet_name
        )
    }

    fn shared_strings_xml(&self) -> String {
        let items: String = self
            .shared_strings
            .iter()
            .map(|s| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, s))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{items}</sst>"#,
            n = self.shared_strings.len(),
            items = items
        )
    }

    fn worksheet_xml(&self) -> String {
        let merges = if self.merges.is_empty() {
            String::new()
        } else {
            let cells: String = self
                .merges
                .iter()
                .map(|m| format!(r#"<mergeCell ref="{}"/>"#, m))
                .collect();
            format!(
                r#"<mergeCells count="{}">{}</mergeCells>"#,
                self.merges.len(),
                cells
            )
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData>{}</worksheet>"#,
            self.sheet_data, merges
        )
    }
}
