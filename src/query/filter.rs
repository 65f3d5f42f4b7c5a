use std::fmt::{self, Write};

/// Boolean predicate over a note path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Everything,
    Nothing,
    /// Case-sensitive substring match.
    Contains(String),
    /// Negation of the conjunction of its members.
    Not(Vec<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Top,
    AndMember,
    OrMember,
    NotOperand,
}

impl Filter {
    pub fn applies_to(&self, path: &str) -> bool {
        match self {
            Self::Everything => true,
            Self::Nothing => false,
            Self::Contains(text) => path.contains(text.as_str()),
            Self::Not(filters) => !filters.iter().all(|filter| filter.applies_to(path)),
            Self::And(filters) => filters.iter().all(|filter| filter.applies_to(path)),
            Self::Or(filters) => filters.iter().any(|filter| filter.applies_to(path)),
        }
    }

    /// Canonical query text that parses back into an equivalent filter.
    pub fn to_query(&self) -> String {
        let mut out = String::new();
        // Writing into a String never fails.
        let _ = self.write_query(&mut out, Position::Top);
        out
    }

    fn write_query(&self, out: &mut String, position: Position) -> fmt::Result {
        match self {
            Self::Everything | Self::Nothing => Ok(()),
            Self::Contains(text) => write_term(out, text),
            Self::Not(filters) => {
                out.push('-');
                match filters.as_slice() {
                    [single] => single.write_query(out, Position::NotOperand),
                    members => write_joined(out, members, " ", Position::AndMember, true),
                }
            }
            Self::And(filters) => match filters.as_slice() {
                [single] => single.write_query(out, position),
                members => {
                    let parenthesized =
                        matches!(position, Position::AndMember | Position::NotOperand);
                    write_joined(out, members, " ", Position::AndMember, parenthesized)
                }
            },
            Self::Or(filters) => match filters.as_slice() {
                [single] => single.write_query(out, position),
                members => {
                    let parenthesized = position != Position::Top;
                    write_joined(out, members, " OR ", Position::OrMember, parenthesized)
                }
            },
        }
    }
}

fn write_joined(
    out: &mut String,
    members: &[Filter],
    separator: &str,
    position: Position,
    parenthesized: bool,
) -> fmt::Result {
    if parenthesized {
        out.push('(');
    }
    for (index, member) in members.iter().enumerate() {
        if index > 0 {
            out.push_str(separator);
        }
        member.write_query(out, position)?;
    }
    if parenthesized {
        out.push(')');
    }
    Ok(())
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.starts_with('-')
        || text.eq_ignore_ascii_case("or")
        || text.eq_ignore_ascii_case("and")
        || text
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '(' | ')' | '"'))
}

fn write_term(out: &mut String, text: &str) -> fmt::Result {
    if !needs_quotes(text) {
        out.push_str(text);
        return Ok(());
    }

    out.push('"');
    for ch in text.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.write_char(ch)?;
    }
    out.push('"');
    Ok(())
}
