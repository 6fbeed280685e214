//! Caret-style text rendering of diagnostics

use super::Diagnostic;

/// Render a diagnostic against its source expression:
///
/// ```text
/// parser error: unexpected ')', expected an expression
///   name.where()
///             ^
///   - supply a criteria expression, e.g. where(use = 'official')
/// ```
pub fn format_diagnostic(diagnostic: &Diagnostic, source: &str) -> String {
    let mut out = format!("{}: {}", diagnostic.kind, diagnostic.message);

    // Locate the line holding the span start; expressions are usually a
    // single line but comments can introduce more
    let start = diagnostic.span.start.min(source.len());
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(source.len());
    let line = &source[line_start..line_end];

    out.push_str("\n  ");
    out.push_str(line);

    let caret_offset = source[line_start..start].chars().count();
    let span_end = diagnostic.span.end.clamp(start, line_end);
    let caret_width = source[start..span_end].chars().count().max(1);
    out.push_str("\n  ");
    out.push_str(&" ".repeat(caret_offset));
    out.push_str(&"^".repeat(caret_width));

    for suggestion in &diagnostic.suggestions {
        out.push_str("\n  - ");
        out.push_str(suggestion);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::parser::span::Span;

    #[test]
    fn test_caret_under_span() {
        let source = "name.where(";
        let diagnostic = Diagnostic::error("parser error", "unclosed '('", Span::new(10, 11));
        let rendered = format_diagnostic(&diagnostic, source);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "parser error: unclosed '('");
        assert_eq!(lines[1], "  name.where(");
        assert_eq!(lines[2], "            ^");
    }

    #[test]
    fn test_suggestions_render_as_bullets() {
        let diagnostic = Diagnostic::error("compile error", "unknown function 'Count'", Span::new(0, 5))
            .suggest("did you mean 'count'?");
        let rendered = format_diagnostic(&diagnostic, "Count()");
        assert!(rendered.contains("\n  - did you mean 'count'?"));
    }

    #[test]
    fn test_span_at_end_of_input() {
        let source = "1 +";
        let diagnostic = Diagnostic::error("parser error", "unexpected end of input", Span::new(3, 3));
        let rendered = format_diagnostic(&diagnostic, source);
        assert!(rendered.contains("^"));
    }
}
