//! Number formats from styles.xml, reduced to "is this a date?"
//!
//! XLSX stores dates as plain serial numbers; only the cell's number format
//! says whether `45322` is a count or the 31st of January 2024.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Per-`cellXfs` entry: whether the style formats numbers as dates
#[derive(Debug, Default)]
pub(crate) struct CellFormats {
    date_styles: Vec<bool>,
}

impl CellFormats {
    /// Check if the cell style at `index` (the `s` attribute) is a date format
    pub(crate) fn is_date(&self, index: usize) -> bool {
        self.date_styles.get(index).copied().unwrap_or(false)
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<CellFormats> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut numfmts: HashMap<u32, String> = HashMap::new();
    let mut xf_numfmt_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => xf_numfmt_ids.push(numfmt_id(&e).unwrap_or(0)),
                b"numFmt" => insert_numfmt(&e, &mut numfmts),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"xf" if in_cell_xfs => xf_numfmt_ids.push(numfmt_id(&e).unwrap_or(0)),
                b"numFmt" => insert_numfmt(&e, &mut numfmts),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let date_styles = xf_numfmt_ids
        .into_iter()
        .map(|id| match numfmts.get(&id) {
            Some(code) => is_date_format_code(code),
            None => is_builtin_date_format(id),
        })
        .collect();

    Ok(CellFormats { date_styles })
}

fn numfmt_id(e: &BytesStart<'_>) -> Option<u32> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"numFmtId")
        .and_then(|attr| attr.unescape_value().ok()?.parse().ok())
}

fn insert_numfmt(e: &BytesStart<'_>, numfmts: &mut HashMap<u32, String>) {
    let mut id = None;
    let mut code = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"numFmtId" => id = attr.unescape_value().ok().and_then(|s| s.parse().ok()),
            b"formatCode" => code = attr.unescape_value().ok().map(|s| s.to_string()),
            _ => {}
        }
    }
    if let (Some(id), Some(code)) = (id, code) {
        numfmts.insert(id, code);
    }
}

/// Built-in format ids that render as dates or times
fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Check a custom format code for date/time tokens.
///
/// Quoted literals, backslash escapes and bracketed sections (colors,
/// conditions, locales) are ignored before looking for `d m y h s`.
fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    let mut in_brackets = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' => {
                chars.next();
            }
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if in_brackets => {}
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }

    false
}
