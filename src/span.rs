// Placeholder span scanning
// Balanced `$` + bracket spans with backslash escaping

use indexmap::IndexMap;
use thiserror::Error;

/// Span scanning errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpanError {
    #[error("Unterminated span at offset {offset}: {text}")]
    Unterminated { offset: usize, text: String },
}

/// The characters making up one kind of placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanSyntax {
    pub sigil: char,
    pub open: char,
    pub close: char,
    pub escape: char,
}

impl SpanSyntax {
    /// `${path.to.value}`
    pub const VARIABLE: SpanSyntax = SpanSyntax {
        sigil: '$',
        open: '{',
        close: '}',
        escape: '\\',
    };

    /// `$(expression)`
    pub const EXPRESSION: SpanSyntax = SpanSyntax {
        sigil: '$',
        open: '(',
        close: ')',
        escape: '\\',
    };

    /// Whether an unescaped sigil + open delimiter starts at `chars[i]`
    fn starts_at(&self, chars: &[(usize, char)], i: usize) -> bool {
        chars[i].1 == self.sigil
            && chars.get(i + 1).is_some_and(|&(_, c)| c == self.open)
            && (i == 0 || chars[i - 1].1 != self.escape)
    }
}

/// A located placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Full text including sigil and delimiters, e.g. `${a.b}`
    pub literal: String,
    /// Text strictly between the delimiters, e.g. `a.b`
    pub inner: String,
}

/// Find every top-level, balanced, unescaped span in `input`.
///
/// Starts are matched left to right without overlap. A start that lies
/// before the closing delimiter of the previously accepted span is skipped.
/// From an accepted start, a depth counter beginning at the open delimiter
/// locates the matching close. Spans are returned in order of first
/// appearance; repeated literals are reported once.
pub fn find(input: &str, syntax: &SpanSyntax) -> Result<Vec<Span>, SpanError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut spans: IndexMap<String, String> = IndexMap::new();
    let mut last = 0;
    let mut i = 0;

    while i < chars.len() {
        if !syntax.starts_at(&chars, i) {
            i += 1;
            continue;
        }

        let start = i;
        i += 2;
        if start < last {
            continue;
        }

        let end = find_end(&chars, start + 1, syntax).ok_or_else(|| SpanError::Unterminated {
            offset: chars[start].0,
            text: input[chars[start].0..].to_string(),
        })?;
        last = end;

        let literal_start = chars[start].0;
        let inner_start = chars[start + 1].0 + syntax.open.len_utf8();
        let close_at = chars[end].0;
        let literal = &input[literal_start..close_at + syntax.close.len_utf8()];
        let inner = &input[inner_start..close_at];

        spans
            .entry(literal.to_string())
            .or_insert_with(|| inner.to_string());
    }

    Ok(spans
        .into_iter()
        .map(|(literal, inner)| Span { literal, inner })
        .collect())
}

/// Index of the close delimiter balancing the open delimiter at `open_at`
fn find_end(chars: &[(usize, char)], open_at: usize, syntax: &SpanSyntax) -> Option<usize> {
    let mut depth = 0usize;
    for (index, &(_, c)) in chars.iter().enumerate().skip(open_at) {
        if c == syntax.open {
            depth += 1;
        }
        if c == syntax.close {
            depth = depth.saturating_sub(1);
        }
        if depth == 0 {
            return Some(index);
        }
    }
    None
}

/// Strip the sigil from every unescaped sigil + open delimiter pair,
/// flattening nested spans into plain bracketed text.
pub fn unwrap_nested(input: &str, syntax: &SpanSyntax) -> String {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut result = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        if syntax.starts_at(&chars, i) {
            result.push(syntax.open);
            i += 2;
        } else {
            result.push(chars[i].1);
            i += 1;
        }
    }
    result
}

/// Replace every escape + sigil pair with the bare sigil
pub fn unescape(input: &str, syntax: &SpanSyntax) -> String {
    let mut escaped = String::with_capacity(2);
    escaped.push(syntax.escape);
    escaped.push(syntax.sigil);
    input.replace(&escaped, &syntax.sigil.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(input: &str) -> Vec<(String, String)> {
        find(input, &SpanSyntax::VARIABLE)
            .unwrap()
            .into_iter()
            .map(|s| (s.literal, s.inner))
            .collect()
    }

    fn pair(literal: &str, inner: &str) -> (String, String) {
        (literal.to_string(), inner.to_string())
    }

    #[test]
    fn test_no_spans() {
        for input in ["", "$", "$200", "some$thing", "something$", "{x}"] {
            assert!(variables(input).is_empty(), "{}", input);
        }
    }

    #[test]
    fn test_simple_and_empty() {
        assert_eq!(variables("${}"), vec![pair("${}", "")]);
        assert_eq!(variables("a ${b.c} d"), vec![pair("${b.c}", "b.c")]);
    }

    #[test]
    fn test_repeated_literal_reported_once() {
        assert_eq!(
            variables("${a}-${b}-${a}"),
            vec![pair("${a}", "a"), pair("${b}", "b")]
        );
    }

    #[test]
    fn test_nested_is_one_top_level_span() {
        assert_eq!(
            variables("${a.${b}}"),
            vec![pair("${a.${b}}", "a.${b}")]
        );
    }

    #[test]
    fn test_escaped_start_is_ignored() {
        assert!(variables("\\${a}").is_empty());
        // The unescaped span inside escaped text is still found
        assert_eq!(
            variables("\\${names.1.${key}}"),
            vec![pair("${key}", "key")]
        );
    }

    #[test]
    fn test_unterminated() {
        let err = find("x ${a.b", &SpanSyntax::VARIABLE).unwrap_err();
        assert_eq!(
            err,
            SpanError::Unterminated {
                offset: 2,
                text: "${a.b".to_string()
            }
        );
        assert!(find("${a.${b}", &SpanSyntax::VARIABLE).is_err());
        assert!(find("${a.${b.c}", &SpanSyntax::VARIABLE).is_err());
        assert!(find("$(1 + 2", &SpanSyntax::EXPRESSION).is_err());
    }

    #[test]
    fn test_expression_spans() {
        let spans = find("$(f(1)) and $(g())", &SpanSyntax::EXPRESSION).unwrap();
        let literals: Vec<&str> = spans.iter().map(|s| s.literal.as_str()).collect();
        assert_eq!(literals, vec!["$(f(1))", "$(g())"]);
        assert_eq!(spans[0].inner, "f(1)");
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(variables("é ${ü} ø"), vec![pair("${ü}", "ü")]);
    }

    #[test]
    fn test_unwrap_nested() {
        let syntax = SpanSyntax::EXPRESSION;
        assert_eq!(unwrap_nested("$(1 - 2) + 3", &syntax), "(1 - 2) + 3");
        assert_eq!(unwrap_nested("\\$(1)", &syntax), "\\$(1)");
        assert_eq!(unwrap_nested("$5", &syntax), "$5");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("\\${a} \\$(b) \\x", &SpanSyntax::VARIABLE), "${a} $(b) \\x");
    }
}
