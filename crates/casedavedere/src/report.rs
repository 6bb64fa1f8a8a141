//! HTML rendering of matched listings, for the report file and the email body.

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::filter::PropertyFilter;
use crate::types::PropertyRecord;

pub const TITLE: &str = "Case Da Vedere";

const STYLE: &str = r#"  html, body { text-align : center; font-family : "Verdana", sans-serif }
  h1, h2, h3, h4, h5, h6 { font-family : "Segoe UI", sans-serif }
  table.filter { margin-left : auto; margin-right : auto }
  table.counter { margin-left : auto; margin-right : auto }
  table.imm { background-color : #D4EBF2; border : 1px solid black; border-collapse : collapse; margin-left : auto; margin-right : auto }
"#;

#[derive(Debug, thiserror::Error)]
#[error("Failed to write report {path}: {source}")]
pub struct ReportError {
    path: PathBuf,
    source: io::Error,
}

fn clean_fragment(fragment: &str) -> String {
    fragment.replace("\\t", "").replace("\\n", "")
}

/// A standalone HTML page listing `records` under the description of `filter`.
pub struct Report<'a> {
    pub filter: &'a PropertyFilter,
    pub records: Vec<&'a PropertyRecord>,
    pub generated_at: DateTime<Local>,
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang=\"it\">")?;
        writeln!(f, " <meta charset=\"UTF-8\">")?;
        writeln!(f, " <title>{TITLE}</title>")?;
        write!(f, " <style>\n{STYLE} </style>\n")?;
        writeln!(f, " <body>")?;
        writeln!(f, "<h1>{TITLE}</h1>")?;
        writeln!(f, "<h3>[{}]</h3>", self.generated_at.format("%d/%m/%Y %H:%M:%S"))?;
        writeln!(f, "<br>")?;

        writeln!(f, "<table class=\"filter\">")?;
        writeln!(f, " <tr><th>Filtro Applicato:</th></tr>")?;
        for line in self.filter.describe() {
            writeln!(f, " <tr><td>{}</td></tr>", line)?;
        }
        writeln!(f, "</table>")?;
        writeln!(f, "<br>")?;

        writeln!(f, "<table class=\"counter\">")?;
        writeln!(f, " <tr><th>Trovati:</th></tr>")?;
        writeln!(f, " <tr><td>{}</td></tr>", self.records.len())?;
        writeln!(f, "</table>")?;
        writeln!(f, "<br><br>")?;

        for record in &self.records {
            writeln!(f, "{}<br>", clean_fragment(&record.fragment))?;
        }

        writeln!(f, " </body>")?;
        write!(f, "</html>")
    }
}

pub fn render_report<'a>(
    filter: &'a PropertyFilter,
    records: impl IntoIterator<Item = &'a PropertyRecord>,
    generated_at: DateTime<Local>,
) -> String {
    Report {
        filter,
        records: records.into_iter().collect(),
        generated_at,
    }
    .to_string()
}

/// Renders the report and overwrites `path` with it.
pub fn write_report<'a>(
    path: &Path,
    filter: &'a PropertyFilter,
    records: impl IntoIterator<Item = &'a PropertyRecord>,
    generated_at: DateTime<Local>,
) -> Result<(), ReportError> {
    fs::write(path, render_report(filter, records, generated_at)).map_err(|source| {
        ReportError {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap()
    }

    fn listing(fragment: &str) -> PropertyRecord {
        PropertyRecord::new("https://www.casedavedere.it/immobile/1-1", fragment)
    }

    #[test]
    fn test_render_report() {
        let filter = PropertyFilter {
            min_rooms: 3,
            require_elevator: true,
            ..Default::default()
        };
        let records = [
            listing(r#"<table class="imm"><tr class="imm"><td>A</td></tr></table>"#),
            listing(r#"<table class="imm"><tr class="imm"><td>B\n</td></tr></table>"#),
        ];

        let html = render_report(&filter, &records, at());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Case Da Vedere</title>"));
        assert!(html.contains("<h3>[07/03/2026 09:05:01]</h3>"));
        assert!(html.contains("<html lang=\"it\">"));
        assert!(html.contains("<tr><th>Filtro Applicato:</th></tr>"));
        assert!(html.contains("<tr><td>Almeno 3 locali</td></tr>"));
        assert!(html.contains("<tr><td>Con ascensore</td></tr>"));
        assert!(html.contains("<tr><th>Trovati:</th></tr>"));
        assert!(html.contains("<tr><td>2</td></tr>"));
        assert!(html.contains("<td>A</td>"));
        assert!(html.contains("<td>B</td>"));
        assert!(html.find("<td>A</td>") < html.find("<td>B</td>"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_render_empty_report() {
        let html = render_report(&PropertyFilter::default(), &[] as &[PropertyRecord], at());

        assert!(html.contains("<tr><td>0</td></tr>"));
        assert!(!html.contains("table class=\"imm\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casedavedere.html");

        write_report(&path, &PropertyFilter::default(), &[listing("<p>x</p>")], at()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("<p>x</p><br>"));
    }
}
