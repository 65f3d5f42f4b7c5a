use std::iter::Peekable;
use std::mem;
use std::str::Chars;

use super::filter::Filter;

enum Term {
    Filter(Filter),
    Or,
    Skip,
}

struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }
}

/// Parses a query into a filter tree. Returns `None` when the query contains no terms.
///
/// Malformed input never fails: unbalanced parentheses and quotes close at end of
/// input, stray `)` at the top level and dangling `-` are ignored.
pub fn parse(query: &str) -> Option<Filter> {
    let mut scanner = Scanner::new(query);
    parse_sequence(&mut scanner, false)
}

fn parse_sequence(scanner: &mut Scanner<'_>, nested: bool) -> Option<Filter> {
    let mut alternatives: Vec<Vec<Filter>> = Vec::new();
    let mut current: Vec<Filter> = Vec::new();

    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            None => break,
            Some(')') => {
                scanner.bump();
                if nested {
                    break;
                }
                continue;
            }
            Some(_) => {}
        }

        match parse_term(scanner, true) {
            Term::Filter(filter) => current.push(filter),
            Term::Or => alternatives.push(mem::take(&mut current)),
            Term::Skip => {}
        }
    }

    alternatives.push(current);
    combine(alternatives)
}

fn combine(alternatives: Vec<Vec<Filter>>) -> Option<Filter> {
    let mut branches = alternatives
        .into_iter()
        .filter(|filters| !filters.is_empty())
        .map(|mut filters| {
            if filters.len() == 1 {
                filters.remove(0)
            } else {
                Filter::And(filters)
            }
        })
        .collect::<Vec<_>>();

    match branches.len() {
        0 => None,
        1 => branches.pop(),
        _ => Some(Filter::Or(branches)),
    }
}

fn parse_term(scanner: &mut Scanner<'_>, keywords: bool) -> Term {
    match scanner.peek() {
        Some('(') => {
            scanner.bump();
            parse_sequence(scanner, true).map_or(Term::Skip, Term::Filter)
        }
        Some('"') => {
            scanner.bump();
            let phrase = read_phrase(scanner);
            if phrase.is_empty() {
                Term::Skip
            } else {
                Term::Filter(Filter::Contains(phrase))
            }
        }
        Some('-') => {
            scanner.bump();
            match scanner.peek() {
                None | Some(')') => Term::Skip,
                Some(ch) if ch.is_whitespace() => Term::Skip,
                Some(_) => match parse_term(scanner, false) {
                    Term::Filter(filter) => Term::Filter(Filter::Not(vec![filter])),
                    Term::Or | Term::Skip => Term::Skip,
                },
            }
        }
        Some(_) => {
            let word = read_word(scanner);
            if keywords && word.eq_ignore_ascii_case("or") {
                Term::Or
            } else if keywords && word.eq_ignore_ascii_case("and") {
                Term::Skip
            } else if word.is_empty() {
                Term::Skip
            } else {
                Term::Filter(Filter::Contains(word))
            }
        }
        None => Term::Skip,
    }
}

fn read_word(scanner: &mut Scanner<'_>) -> String {
    let mut word = String::new();
    while let Some(ch) = scanner.peek() {
        if ch.is_whitespace() || ch == '(' || ch == ')' {
            break;
        }
        word.push(ch);
        scanner.bump();
    }
    word
}

fn read_phrase(scanner: &mut Scanner<'_>) -> String {
    let mut phrase = String::new();
    while let Some(ch) = scanner.bump() {
        match ch {
            '"' => break,
            '\\' => match scanner.peek() {
                Some(next @ ('"' | '\\')) => {
                    phrase.push(next);
                    scanner.bump();
                }
                _ => phrase.push('\\'),
            },
            _ => phrase.push(ch),
        }
    }
    phrase
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::query::filter::Filter;

    fn contains(text: &str) -> Filter {
        Filter::Contains(text.to_owned())
    }

    #[test]
    fn juxtaposition_is_conjunction() {
        assert_eq!(
            parse("work meeting"),
            Some(Filter::And(vec![contains("work"), contains("meeting")]))
        );
    }

    #[test]
    fn or_splits_everything_before_it() {
        assert_eq!(
            parse("a b or c"),
            Some(Filter::Or(vec![
                Filter::And(vec![contains("a"), contains("b")]),
                contains("c"),
            ]))
        );
    }

    #[test]
    fn and_keyword_is_dropped() {
        assert_eq!(parse("a AND b"), parse("a b"));
    }

    #[test]
    fn dangling_keywords_are_discarded() {
        assert_eq!(parse("a OR"), Some(contains("a")));
        assert_eq!(parse("OR a"), Some(contains("a")));
        assert_eq!(parse("a AND"), Some(contains("a")));
        assert_eq!(parse("OR"), None);
    }

    #[test]
    fn negation_takes_one_sub_term() {
        assert_eq!(
            parse("-work meeting"),
            Some(Filter::And(vec![
                Filter::Not(vec![contains("work")]),
                contains("meeting"),
            ]))
        );
        assert_eq!(
            parse("-(a b)"),
            Some(Filter::Not(vec![Filter::And(vec![contains("a"), contains("b")])]))
        );
        assert_eq!(parse(r#"-"a b""#), Some(Filter::Not(vec![contains("a b")])));
        assert_eq!(parse("-or"), Some(Filter::Not(vec![contains("or")])));
    }

    #[test]
    fn dangling_negation_is_ignored() {
        assert_eq!(parse("a -"), Some(contains("a")));
        assert_eq!(parse("(a -)"), Some(contains("a")));
    }

    #[test]
    fn phrases_keep_whitespace_and_escapes() {
        assert_eq!(parse(r#""exact phrase""#), Some(contains("exact phrase")));
        assert_eq!(parse(r#""say \"hi\"""#), Some(contains(r#"say "hi""#)));
        assert_eq!(parse(r#""a\b""#), Some(contains(r"a\b")));
        assert_eq!(parse(r#""""#), None);
    }

    #[test]
    fn groups_handle_or_independently() {
        assert_eq!(
            parse("meeting (work OR meetup) -personal"),
            Some(Filter::And(vec![
                contains("meeting"),
                Filter::Or(vec![contains("work"), contains("meetup")]),
                Filter::Not(vec![contains("personal")]),
            ]))
        );
    }

    #[test]
    fn unbalanced_input_is_best_effort() {
        assert_eq!(
            parse("(a OR b"),
            Some(Filter::Or(vec![contains("a"), contains("b")]))
        );
        assert_eq!(parse("a) b"), Some(Filter::And(vec![contains("a"), contains("b")])));
        assert_eq!(parse(r#""open phrase"#), Some(contains("open phrase")));
        assert_eq!(parse("()"), None);
    }

    #[test]
    fn canonical_query_parses_back() {
        for query in [
            "meeting (work OR meetup) -personal",
            r#"a b OR "c d" -(e OR f)"#,
            "-(a b) c",
        ] {
            let filter = parse(query);
            let canonical = filter.as_ref().map(Filter::to_query).unwrap_or_default();
            assert_eq!(parse(&canonical), filter, "{query} -> {canonical}");
        }
    }
}
