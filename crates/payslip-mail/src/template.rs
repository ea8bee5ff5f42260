//! Message template built once per run
//!
//! The template is kept as literal segments around two holes, the
//! recipient's name and the record table body. Filling it is plain
//! concatenation, so text that looks like markup or a placeholder inside a
//! cell is never expanded a second time.

use chrono::NaiveDate;

use payslip_core::{escape_html, render_block, Block, CellTag, Sheet};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    RecipientName,
    RecordBody,
}

/// Message body with recipient name and record rows left open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Build the template from the already rendered header rows.
    ///
    /// `preamble` is wrapped in `<pre>` and dropped when empty; `signature`
    /// is appended as-is.
    pub fn new(header_rows: &str, preamble: &str, signature: &str, date: NaiveDate) -> Self {
        let head = String::from("Dear, ");
        let mut tail = String::from(" ");

        if !preamble.is_empty() {
            tail.push_str("<pre>");
            tail.push_str(preamble);
            tail.push_str("</pre><br/>");
        }
        tail.push_str(r#"<table border="1px solid black"><thead>"#);
        tail.push_str(header_rows);
        tail.push_str("</thead><tbody>");

        let mut footer = String::from("</tbody></table>");
        footer.push_str("<div><span></span><div>&nbsp;</div>");
        footer.push_str(&date.format("%Y-%m-%d").to_string());
        footer.push_str("</div>");
        footer.push_str(
            r##"<hr color="#b5c4df" size="1" align="left" style="width: 210px; height: 1px;">"##,
        );
        footer.push_str(signature);

        Self {
            segments: vec![
                Segment::Literal(head),
                Segment::RecipientName,
                Segment::Literal(tail),
                Segment::RecordBody,
                Segment::Literal(footer),
            ],
        }
    }

    /// Build the template with the header block of `sheet`
    pub fn for_header(
        sheet: &Sheet,
        header: &Block<'_>,
        preamble: &str,
        signature: &str,
        date: NaiveDate,
    ) -> Self {
        let header_rows = render_block(sheet, header, CellTag::Header);
        Self::new(&header_rows, preamble, signature, date)
    }

    /// Fill in one recipient.
    ///
    /// `name` is plain text and gets escaped; `record_rows` is markup from
    /// the table renderer.
    pub fn render(&self, name: &str, record_rows: &str) -> String {
        let name = escape_html(name);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::RecipientName => out.push_str(&name),
                Segment::RecordBody => out.push_str(record_rows),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payslip_core::{segment, SheetBuilder};
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_full_layout() {
        let template = MessageTemplate::new("<tr><th>Month</th></tr>", "See below", "<b>HR</b>", date());
        let html = template.render("Alice", "<tr><td>Jan</td></tr>");

        assert_eq!(
            html,
            concat!(
                "Dear, Alice <pre>See below</pre><br/>",
                r#"<table border="1px solid black"><thead><tr><th>Month</th></tr></thead>"#,
                "<tbody><tr><td>Jan</td></tr></tbody></table>",
                "<div><span></span><div>&nbsp;</div>2024-02-01</div>",
                r##"<hr color="#b5c4df" size="1" align="left" style="width: 210px; height: 1px;">"##,
                "<b>HR</b>"
            )
        );
    }

    #[test]
    fn test_empty_preamble_is_omitted() {
        let template = MessageTemplate::new("", "", "", date());
        let html = template.render("Bob", "");
        assert!(html.starts_with(r#"Dear, Bob <table border="1px solid black">"#));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn test_substitution_is_not_recursive() {
        let template = MessageTemplate::new("", "", "", date());
        let html = template.render("<<salary>> & co", "<tr><td>Dear, </td></tr>");
        assert!(html.starts_with("Dear, &lt;&lt;salary&gt;&gt; &amp; co "));
        assert_eq!(html.matches("<tbody><tr><td>Dear, </td></tr></tbody>").count(), 1);
    }

    #[test]
    fn test_for_header_renders_th_cells() {
        let mut builder = SheetBuilder::new("Payroll");
        builder.push_row(["Email", "Month", "Name"]).unwrap();
        builder.push_row(["a@x.com", "Jan", "Alice"]).unwrap();
        let sheet = builder.build().unwrap();
        let seg = segment(&sheet).unwrap();

        let template = MessageTemplate::for_header(&sheet, &seg.header, "", "", date());
        let html = template.render("Alice", "");
        assert!(html.contains(r#"<thead><tr><th style="padding-left:20px;padding-right:20px;">Month</th>"#));
        assert!(!html.contains("Email"));
    }
}
