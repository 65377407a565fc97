use std::io::Write;

use owo_colors::OwoColorize;
use sabhalekh_extract::KramankRecord;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the human-readable processing summary.
pub fn print_summary(
    w: &mut dyn Write,
    record: &KramankRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    if let Some(session) = &record.session {
        writeln!(
            w,
            "Session: {} {} ({}) / {}",
            session.year, session.house, session.session_type, session.kramank_name
        )?;
    }
    if let Some(chairman) = &record.chairman {
        writeln!(w, "Chair:   {}", chairman)?;
    }
    if let Some(date) = &record.date {
        writeln!(w, "Sitting: {}", date)?;
    }
    writeln!(w)?;

    let counts = format!(
        "{} members, {} resolutions, {} debates",
        record.members.len(),
        record.resolutions.len(),
        record.debates.len()
    );
    if color.enabled() {
        writeln!(w, "Extracted {}", counts.green())?;
    } else {
        writeln!(w, "Extracted {}", counts)?;
    }

    for debate in &record.debates {
        let topic = short(&debate.topic, 60);
        if color.enabled() {
            writeln!(
                w,
                "  [{}] {} {}",
                debate.sequence,
                topic,
                format!("({} chars, {} pages)", debate.text.chars().count(), debate.image_names.len())
                    .dimmed()
            )?;
        } else {
            writeln!(
                w,
                "  [{}] {} ({} chars, {} pages)",
                debate.sequence,
                topic,
                debate.text.chars().count(),
                debate.image_names.len()
            )?;
        }
    }
    Ok(())
}

fn short(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabhalekh_core::IndexSummary;

    #[test]
    fn summary_renders_without_color() {
        let record = KramankRecord {
            session: None,
            chairman: Some("मा. अध्यक्ष".into()),
            date: None,
            index: IndexSummary::default(),
            members: vec![],
            resolutions: vec![],
            debates: vec![],
        };
        let mut buf = Vec::new();
        print_summary(&mut buf, &record, ColorMode(false)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("मा. अध्यक्ष"));
        assert!(text.contains("0 members, 0 resolutions, 0 debates"));
    }

    #[test]
    fn long_topics_are_truncated() {
        assert_eq!(short("abcd", 3), "abc...");
        assert_eq!(short("abcd", 10), "abcd");
    }
}
