//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{read_styles_xml, CellFormats};
use payslip_core::{CellAddress, CellError, CellValue, MergeRange, Sheet, SheetBuilder};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Convert a date serial number to a timestamp.
///
/// The 1900 system counts from 1899-12-30 (serials below 60 are shifted by
/// one day to step over Excel's phantom 1900-02-29); the 1904 system counts
/// from 1904-01-01.
fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }

    let epoch = match (date1904, serial < 60.0) {
        (true, _) => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        (false, true) => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        (false, false) => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };

    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// First serial past 9999-12-31 23:59:59, the last date Excel can display
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

/// Parse the ISO 8601 text of a `t="d"` cell
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Sheet list and date system from workbook.xml
#[derive(Debug, Default)]
struct WorkbookInfo {
    /// `(name, relationship id)` in tab order
    sheets: Vec<(String, String)>,
    date1904: bool,
}

/// Lookup tables shared by every cell of a worksheet
struct CellContext<'a> {
    shared_strings: &'a [String],
    formats: &'a CellFormats,
    date1904: bool,
}

/// A `<c>` element being read
#[derive(Debug, Default)]
struct PendingCell {
    reference: Option<String>,
    kind: Option<String>,
    style: Option<usize>,
    value: Option<String>,
    inline_text: Option<String>,
}

/// XLSX file reader
///
/// Only the first worksheet is read. Formula cells contribute their cached
/// result, so the sheet holds the values Excel last displayed.
pub struct XlsxReader;

impl XlsxReader {
    /// Read the first worksheet from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Sheet> {
        let path = path.as_ref();
        log::debug!("opening workbook '{}'", path.display());
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read the first worksheet from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Sheet> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let workbook = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let (name, r_id) = workbook
            .sheets
            .first()
            .ok_or_else(|| XlsxError::InvalidFormat("Workbook has no sheets".into()))?;
        let path = sheet_paths.get(r_id).ok_or_else(|| {
            XlsxError::MissingPart(format!("worksheet relationship '{}'", r_id))
        })?;

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let formats = Self::read_styles(&mut archive)?;

        let context = CellContext {
            shared_strings: &shared_strings,
            formats: &formats,
            date1904: workbook.date1904,
        };

        let mut builder = SheetBuilder::new(name.clone());
        Self::read_worksheet(&mut archive, path, &mut builder, &context)?;
        let sheet = builder.build()?;

        log::debug!(
            "read sheet '{}': {} rows x {} columns, {} merged regions",
            sheet.name(),
            sheet.row_count(),
            sheet.col_count(),
            sheet.merged_regions().len()
        );

        Ok(sheet)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) repeat the reading of East Asian text
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Ok(Event::CData(e)) if in_t => {
                    current_string.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<CellFormats> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(CellFormats::default()),
        }
    }

    /// Read workbook.xml to get sheet names, rIds and the date system
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookInfo> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorkbookInfo::default();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"sheet" => {
                        let mut name = None;
                        let mut r_id = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"name" => {
                                    name = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                // r:id, whatever the relationships prefix is
                                key if attr.key.local_name().as_ref() == b"id"
                                    && key != b"id" =>
                                {
                                    r_id = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(name), Some(r_id)) = (name, r_id) {
                            info.sheets.push((name, r_id));
                        }
                    }
                    b"workbookPr" => {
                        info.date1904 = e
                            .attributes()
                            .flatten()
                            .find(|attr| attr.key.as_ref() == b"date1904")
                            .and_then(|attr| attr.unescape_value().ok())
                            .map_or(false, |v| v == "1" || v == "true");
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    // Only include worksheet relationships
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/ folder
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read cell values and merged regions of a worksheet into `builder`
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        builder: &mut SheetBuilder,
        context: &CellContext<'_>,
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);

        let mut buf = Vec::new();

        // Position used for cells that omit their r attribute
        let mut current_row: u32 = 0;
        let mut next_col: u32 = 1;

        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        current_row = row_number(&e).unwrap_or(current_row + 1);
                        next_col = 1;
                    }
                    b"c" => cell = Some(pending_cell(&e)),
                    b"v" if cell.is_some() => in_value = true,
                    b"rPh" => in_phonetic = true,
                    b"t" if cell.is_some() && !in_phonetic => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        current_row = row_number(&e).unwrap_or(current_row + 1);
                        next_col = 1;
                    }
                    b"c" => {
                        let address = resolve_address(&pending_cell(&e), current_row, next_col)?;
                        builder.extend_to(address.row, address.col);
                        next_col = address.col + 1;
                    }
                    b"mergeCell" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"ref" {
                                let ref_str = String::from_utf8_lossy(&attr.value);
                                match MergeRange::parse(&ref_str) {
                                    Ok(range) => {
                                        builder.merge(range)?;
                                    }
                                    Err(err) => {
                                        log::warn!("ignoring merged region '{}': {}", ref_str, err)
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"rPh" => in_phonetic = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            let address = resolve_address(&pending, current_row, next_col)?;
                            let value = cell_value(&pending, context)?;
                            builder.set(address.row, address.col, value)?;
                            next_col = address.col + 1;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value || in_inline_text => {
                    let text = e.unescape()?;
                    if let Some(pending) = cell.as_mut() {
                        let slot = if in_value {
                            &mut pending.value
                        } else {
                            &mut pending.inline_text
                        };
                        slot.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

fn row_number(e: &BytesStart<'_>) -> Option<u32> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"r")
        .and_then(|attr| attr.unescape_value().ok()?.parse().ok())
}

fn pending_cell(e: &BytesStart<'_>) -> PendingCell {
    let mut pending = PendingCell::default();

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                pending.reference = attr.unescape_value().ok().map(|s| s.to_string());
            }
            b"t" => {
                pending.kind = attr.unescape_value().ok().map(|s| s.to_string());
            }
            b"s" => {
                pending.style = attr
                    .unescape_value()
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok());
            }
            _ => {}
        }
    }

    pending
}

fn resolve_address(pending: &PendingCell, row: u32, col: u32) -> XlsxResult<CellAddress> {
    match pending.reference.as_deref() {
        Some(r) => CellAddress::parse(r)
            .map_err(|e| XlsxError::Parse(format!("Invalid cell reference '{}': {}", r, e))),
        None if row > 0 => Ok(CellAddress::new(row, col)),
        None => Err(XlsxError::Parse("Cell outside of any row".into())),
    }
}

/// Turn the raw text of a cell into its value according to its type
fn cell_value(pending: &PendingCell, context: &CellContext<'_>) -> XlsxResult<CellValue> {
    if pending.kind.as_deref() == Some("inlineStr") {
        let text = pending.inline_text.as_deref().unwrap_or_default();
        return Ok(CellValue::string(decode_excel_escapes(text)));
    }

    let value = match pending.value.as_deref() {
        Some(v) => v,
        None => return Ok(CellValue::Empty),
    };

    let cell_value = match pending.kind.as_deref() {
        // Shared string
        Some("s") => {
            let idx: usize = value.trim().parse().map_err(|_| {
                XlsxError::Parse(format!("Invalid shared string index: {}", value))
            })?;
            let s = context.shared_strings.get(idx).ok_or_else(|| {
                XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
            })?;
            CellValue::string(s.as_str())
        }

        // Boolean
        Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

        // Error
        Some("e") => CellError::from_code(value)
            .map(CellValue::Error)
            .unwrap_or_else(|| CellValue::string(value)),

        // Formula string result
        Some("str") => CellValue::string(decode_excel_escapes(value)),

        // ISO 8601 date
        Some("d") => parse_iso_datetime(value)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::string(value)),

        // Number (default type or explicit "n")
        None | Some("n") => match value.trim().parse::<f64>() {
            Ok(n) if pending.style.map_or(false, |s| context.formats.is_date(s)) => {
                serial_to_datetime(n, context.date1904)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(n))
            }
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::string(value),
        },

        // Unknown type - treat as string
        Some(_) => CellValue::string(value),
    };

    Ok(cell_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
        assert_eq!(decode_excel_escapes("a@x.com_x000a_"), "a@x.com\n");
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        // Incomplete sequences should be left as-is
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("_x_x000A_"), "_x\n");
    }

    #[test]
    fn test_serial_to_datetime() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(serial_to_datetime(45322.0, false), Some(jan31));

        let noon = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(serial_to_datetime(45322.5, false), Some(noon));

        let first = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(serial_to_datetime(1.0, false), Some(first));

        let epoch_1904 = NaiveDate::from_ymd_opt(1904, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(serial_to_datetime(0.0, true), Some(epoch_1904));
        assert_eq!(serial_to_datetime(-1.0, false), None);
        assert_eq!(serial_to_datetime(1.0e15, false), None);
        assert_eq!(serial_to_datetime(f64::INFINITY, true), None);

        let last = NaiveDate::from_ymd_opt(9999, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(serial_to_datetime(2_958_465.0, false), Some(last));
    }

    #[test]
    fn test_parse_iso_datetime() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_iso_datetime("2024-02-01T08:30:00Z"), Some(expected));
        assert_eq!(
            parse_iso_datetime("2024-02-01"),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_iso_datetime("February"), None);
    }

    #[test]
    fn test_read_empty_xlsx() {
        // Minimal valid XLSX structure
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options)
                .unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData></sheetData></worksheet>"#).unwrap();

            zip.finish().unwrap();
        }

        let sheet = XlsxReader::read(Cursor::new(buf)).unwrap();

        assert_eq!(sheet.name(), "Sheet1");
        assert!(sheet.is_empty());
        assert!(sheet.merged_regions().is_empty());
    }

    #[test]
    fn test_read_rejects_non_xlsx_zip() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"not a workbook").unwrap();
            zip.finish().unwrap();
        }

        let err = XlsxReader::read(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, XlsxError::InvalidFormat(_)));
    }
}
