//! Terminal output formatter

use citerag_core::ingest::HistoryEntry;
use citerag_core::query::Citation;
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

/// Longest citation excerpt shown before truncating
const EXCERPT_CHARS: usize = 160;

pub fn write_citations(out: &mut impl WriteColor, citations: &[Citation]) -> io::Result<()> {
    if citations.is_empty() {
        return Ok(());
    }

    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "Sources")?;
    out.reset()?;

    for citation in citations {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(out, "[{}]", citation.id)?;
        out.reset()?;
        write!(out, " {} ", citation.source)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Black)).set_intense(true))?;
        writeln!(out, "({:.0}%)", citation.score * 100.0)?;
        out.reset()?;
        writeln!(out, "    {}", excerpt(&citation.text))?;
    }
    writeln!(out)?;
    Ok(())
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

pub fn format_documents(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No documents ingested yet\n".to_string();
    }

    let name_width = entries
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(4, 48);

    let mut output = format!(
        "{:<width$}  {:<4}  {:>6}  {}\n",
        "NAME",
        "TYPE",
        "CHUNKS",
        "DATE",
        width = name_width
    );
    for entry in entries {
        output.push_str(&format!(
            "{:<width$}  {:<4}  {:>6}  {}\n",
            entry.name,
            entry.entry_type.as_str(),
            entry.chunk_count,
            short_date(&entry.date),
            width = name_width
        ));
    }
    output
}

fn short_date(date: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(date)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use citerag_core::ingest::EntryType;
    use termcolor::NoColor;

    #[test]
    fn test_citations_listed_in_order() {
        let citations = vec![
            Citation {
                id: 1,
                text: "first\npassage".to_string(),
                source: "a.md".to_string(),
                score: 0.91,
            },
            Citation {
                id: 2,
                text: "second".to_string(),
                source: "b.md".to_string(),
                score: 0.5,
            },
        ];
        let mut out = NoColor::new(Vec::new());
        write_citations(&mut out, &citations).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();

        assert!(text.contains("[1] a.md (91%)"));
        assert!(text.contains("    first passage"));
        assert!(text.find("[1]").unwrap() < text.find("[2]").unwrap());
    }

    #[test]
    fn test_no_citations_writes_nothing() {
        let mut out = NoColor::new(Vec::new());
        write_citations(&mut out, &[]).unwrap();
        assert!(out.into_inner().is_empty());
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(400);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_documents_table() {
        let when = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let entries = vec![HistoryEntry::at(when, "guide.pdf", EntryType::Pdf, 12)];
        let table = format_documents(&entries);
        assert!(table.starts_with("NAME"));
        assert!(table.contains("guide.pdf"));
        assert!(table.contains("PDF"));
        assert!(table.contains("2024-05-01 09:30"));
    }
}
