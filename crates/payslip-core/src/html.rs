//! HTML table rows from sheet rows
//!
//! Column 1 holds the recipient address and is never rendered. Merged
//! regions come out as `rowspan` / `colspan` on their anchor cell, and the
//! cells they cover are dropped so the table keeps its shape.

use std::fmt::Write;

use crate::cell::Cell;
use crate::merge::MergeDescriptor;
use crate::segment::Block;
use crate::sheet::Sheet;

const PADDED: &str = "padding-left:20px;padding-right:20px;";
const CENTERED: &str = "text-align:center;";

/// Which element a row's cells are emitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellTag {
    /// `<th>`, for the header block
    Header,
    /// `<td>`, for record blocks
    Data,
}

impl CellTag {
    /// Element name
    pub fn as_str(&self) -> &'static str {
        match self {
            CellTag::Header => "th",
            CellTag::Data => "td",
        }
    }
}

/// Render rows of `sheet` as `<tr>` elements.
///
/// Merge roles are looked up in `sheet`, so `rows` must come from it.
pub fn render_rows(sheet: &Sheet, rows: &[Vec<Cell>], tag: CellTag) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str("<tr>");
        for cell in row.iter().skip(1) {
            render_cell(&mut out, cell, sheet.descriptor(cell), tag);
        }
        out.push_str("</tr>");
    }
    out
}

/// Render every row of a block
pub fn render_block(sheet: &Sheet, block: &Block<'_>, tag: CellTag) -> String {
    render_rows(sheet, block.rows, tag)
}

fn render_cell(out: &mut String, cell: &Cell, descriptor: MergeDescriptor, tag: CellTag) {
    let tag = tag.as_str();
    let text = escape_html(&cell.value.to_string());

    // Writing into a String cannot fail
    let _ = match descriptor {
        MergeDescriptor::Suppressed => return,
        MergeDescriptor::Normal => write!(out, r#"<{tag} style="{PADDED}">{text}</{tag}>"#),
        MergeDescriptor::RowSpan(n) => write!(
            out,
            r#"<{tag} style="{PADDED}" rowspan="{n}">{text}</{tag}>"#
        ),
        MergeDescriptor::ColSpan(n) => write!(
            out,
            r#"<{tag} style="{CENTERED}" colspan="{n}">{text}</{tag}>"#
        ),
        MergeDescriptor::Mix { rows, cols } => write!(
            out,
            r#"<{tag} style="{CENTERED}" rowspan="{rows}" colspan="{cols}">{text}</{tag}>"#
        ),
    };
}

/// Escape text for use inside HTML element content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeRange;
    use crate::segment::segment;
    use crate::sheet::SheetBuilder;
    use crate::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_plain_row_skips_column_one() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder
            .push_row(["a@x.com", "Jan", "Alice"])
            .unwrap();
        let sheet = builder.build().unwrap();

        let html = render_rows(&sheet, sheet.rows(), CellTag::Data);
        assert_eq!(
            html,
            concat!(
                r#"<tr><td style="padding-left:20px;padding-right:20px;">Jan</td>"#,
                r#"<td style="padding-left:20px;padding-right:20px;">Alice</td></tr>"#
            )
        );
    }

    #[test]
    fn test_render_spans() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.push_row(["Email", "Pay", "", "Remark"]).unwrap();
        builder
            .push_row([CellValue::Empty, "Base".into(), "Bonus".into(), CellValue::Empty])
            .unwrap();
        builder.merge(MergeRange::parse("A1:A2").unwrap()).unwrap();
        builder.merge(MergeRange::parse("B1:C1").unwrap()).unwrap();
        builder.merge(MergeRange::parse("D1:D2").unwrap()).unwrap();
        let sheet = builder.build().unwrap();

        let html = render_rows(&sheet, sheet.rows(), CellTag::Header);
        assert_eq!(
            html,
            concat!(
                "<tr>",
                r#"<th style="text-align:center;" colspan="2">Pay</th>"#,
                r#"<th style="padding-left:20px;padding-right:20px;" rowspan="2">Remark</th>"#,
                "</tr><tr>",
                r#"<th style="padding-left:20px;padding-right:20px;">Base</th>"#,
                r#"<th style="padding-left:20px;padding-right:20px;">Bonus</th>"#,
                "</tr>"
            )
        );
    }

    #[test]
    fn test_render_mix_and_escape() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.push_row(["x", "R&D <ops>", ""]).unwrap();
        builder.push_row(["", "", ""]).unwrap();
        builder.merge(MergeRange::parse("B1:C2").unwrap()).unwrap();
        let sheet = builder.build().unwrap();

        let html = render_rows(&sheet, sheet.rows(), CellTag::Data);
        assert_eq!(
            html,
            r#"<tr><td style="text-align:center;" rowspan="2" colspan="2">R&amp;D &lt;ops&gt;</td></tr><tr></tr>"#
        );
    }

    #[test]
    fn test_render_block_is_deterministic() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.push_row(["Email", "Month"]).unwrap();
        builder.push_row(["a@x.com", "Jan"]).unwrap();
        let sheet = builder.build().unwrap();
        let seg = segment(&sheet).unwrap();

        let first = render_block(&sheet, &seg.records[0], CellTag::Data);
        let second = render_block(&sheet, &seg.records[0], CellTag::Data);
        assert_eq!(first, second);
        assert!(first.contains(">Jan</td>"));
        assert!(!first.contains("a@x.com"));
    }
}
