//! Line classification.
//!
//! Simfiles are consumed one trimmed line at a time. What a line means
//! depends on one bit of parser state: whether a `#NOTES:` block is open.

/// A `#KEY:VALUE;` directive, with the optional third field used by the
/// two-value `#DISPLAYBPM:low:high;` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub extra: Option<&'a str>,
}

impl<'a> Directive<'a> {
    /// Returns `None` unless the line is `#`...`;` with a `:` after the key.
    pub fn parse(line: &'a str) -> Option<Self> {
        let body = line.strip_prefix('#')?.strip_suffix(';')?;
        let mut fields = body.split(':');
        let key = fields.next()?;
        let value = fields.next()?;
        Some(Self {
            key,
            value,
            extra: fields.next(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Blank or `//` comment.
    Skip,
    /// `#NOTEDATA:;`
    NoteData,
    /// `#NOTES:`
    Notes,
    /// `,` between measures.
    MeasureEnd,
    /// `;` closing the last measure and the chart.
    ChartEnd,
    /// A colon-terminated chart property inside `#NOTES:`, colon removed.
    Property(&'a str),
    /// A note-data row inside `#NOTES:`.
    Row(&'a str),
    Directive(Directive<'a>),
    /// Outside `#NOTES:` and not shaped like a directive.
    Malformed,
}

fn strip_trailing_comment(line: &str) -> &str {
    line.find("//").map_or(line, |pos| line[..pos].trim_end())
}

pub fn classify(raw: &str, in_notes: bool) -> Line<'_> {
    let mut line = raw.trim();
    if line.is_empty() || line.starts_with("//") {
        return Line::Skip;
    }
    // A colon-terminated line is a property even when it holds `//`.
    if in_notes && !line.ends_with(':') {
        line = strip_trailing_comment(line);
    }

    match line {
        "#NOTEDATA:;" => Line::NoteData,
        "#NOTES:" => Line::Notes,
        "," => Line::MeasureEnd,
        ";" => Line::ChartEnd,
        _ if in_notes => match line.strip_suffix(':') {
            Some(prop) => Line::Property(prop.trim()),
            None => Line::Row(line),
        },
        _ => Directive::parse(line).map_or(Line::Malformed, Line::Directive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(classify("   ", false), Line::Skip);
        assert_eq!(classify("// measure 1", true), Line::Skip);
        assert_eq!(classify("\t// x", false), Line::Skip);
    }

    #[test]
    fn markers_are_recognized_in_both_modes() {
        for in_notes in [false, true] {
            assert_eq!(classify("#NOTEDATA:;", in_notes), Line::NoteData);
            assert_eq!(classify("  #NOTES:\r", in_notes), Line::Notes);
            assert_eq!(classify(",", in_notes), Line::MeasureEnd);
            assert_eq!(classify(";", in_notes), Line::ChartEnd);
        }
    }

    #[test]
    fn note_mode_lines() {
        assert_eq!(classify("     dance-single:", true), Line::Property("dance-single"));
        assert_eq!(classify(":", true), Line::Property(""));
        assert_eq!(classify("0.1,0.2,0.3,0.4,0.5:", true), Line::Property("0.1,0.2,0.3,0.4,0.5"));
        assert_eq!(classify("1001", true), Line::Row("1001"));
        assert_eq!(classify("1001 // jump", true), Line::Row("1001"));
        assert_eq!(classify(",  // measure 2", true), Line::MeasureEnd);
    }

    #[test]
    fn slashes_inside_a_property_are_kept() {
        assert_eq!(classify("A // B:", true), Line::Property("A // B"));
        assert_eq!(classify("http://example.com:", true), Line::Property("http://example.com"));
        assert_eq!(classify(";  // end: last measure", true), Line::ChartEnd);
    }

    #[test]
    fn directives() {
        assert_eq!(
            classify("#TITLE:Foo;", false),
            Line::Directive(Directive { key: "TITLE", value: "Foo", extra: None })
        );
        assert_eq!(
            classify("#DISPLAYBPM:90:270;", false),
            Line::Directive(Directive { key: "DISPLAYBPM", value: "90", extra: Some("270") })
        );
        assert_eq!(
            classify("#SUBTITLE:;", false),
            Line::Directive(Directive { key: "SUBTITLE", value: "", extra: None })
        );
        // Comment stripping only applies inside #NOTES:.
        assert_eq!(
            classify("#BANNER:http//x;", false),
            Line::Directive(Directive { key: "BANNER", value: "http//x", extra: None })
        );
    }

    #[test]
    fn malformed_directives() {
        assert_eq!(classify("#TITLE:Foo", false), Line::Malformed);
        assert_eq!(classify("TITLE:Foo;", false), Line::Malformed);
        assert_eq!(classify("#TITLE;", false), Line::Malformed);
        assert_eq!(classify("1000", false), Line::Malformed);
    }
}
