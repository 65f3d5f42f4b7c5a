mod filter;
mod parser;

use filter::Filter;

use crate::notes::Note;

/// What an empty query matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Empty query matches every note (timeline-wide filter).
    Inclusive,
    /// Empty query matches nothing (group filters).
    Exclusive,
}

/// A compiled query together with the text it was compiled from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteFilter {
    query: String,
    normalized: String,
    filter: Filter,
}

impl NoteFilter {
    pub fn compile(query: &str, policy: QueryPolicy) -> Self {
        let filter = parser::parse(query).unwrap_or(match policy {
            QueryPolicy::Inclusive => Filter::Everything,
            QueryPolicy::Exclusive => Filter::Nothing,
        });

        Self {
            query: query.to_owned(),
            normalized: filter.to_query(),
            filter,
        }
    }

    pub fn inclusive(query: &str) -> Self {
        Self::compile(query, QueryPolicy::Inclusive)
    }

    pub fn exclusive(query: &str) -> Self {
        Self::compile(query, QueryPolicy::Exclusive)
    }

    pub fn matches(&self, note: &Note) -> bool {
        self.applies_to(note.path())
    }

    pub fn applies_to(&self, path: &str) -> bool {
        self.filter.applies_to(path)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn normalized_query(&self) -> &str {
        &self.normalized
    }
}

#[cfg(test)]
mod tests {
    use super::NoteFilter;

    const PATHS: [&str; 5] = [
        "work.md",
        "work/meeting.md",
        "personal/meeting.md",
        "complaints/work.md",
        "math/workings.md",
    ];

    fn matching(filter: &NoteFilter) -> Vec<&'static str> {
        PATHS
            .iter()
            .copied()
            .filter(|path| filter.applies_to(path))
            .collect()
    }

    #[test]
    fn empty_query_follows_policy() {
        assert_eq!(matching(&NoteFilter::inclusive("")), PATHS.to_vec());
        assert!(matching(&NoteFilter::exclusive("")).is_empty());
        assert!(matching(&NoteFilter::exclusive("   ")).is_empty());
    }

    #[test]
    fn conjunction() {
        assert_eq!(
            matching(&NoteFilter::inclusive("work meeting")),
            vec!["work/meeting.md"]
        );
    }

    #[test]
    fn disjunction() {
        assert_eq!(
            matching(&NoteFilter::inclusive("meeting OR work")),
            PATHS.to_vec()
        );
    }

    #[test]
    fn negation() {
        assert_eq!(
            matching(&NoteFilter::inclusive("-work")),
            vec!["personal/meeting.md"]
        );
    }

    #[test]
    fn grouping() {
        let filter = NoteFilter::inclusive("meeting (work OR meetup) -personal");
        let paths = [
            "work/meeting.md",
            "meetup/meeting.md",
            "personal/meeting.md",
            "personal/work/meeting.md",
            "work.md",
            "meetup/notes.md",
        ];
        let matched = paths
            .into_iter()
            .filter(|path| filter.applies_to(path))
            .collect::<Vec<_>>();
        assert_eq!(matched, vec!["work/meeting.md", "meetup/meeting.md"]);
    }

    #[test]
    fn keeps_raw_and_normalized_query() {
        let filter = NoteFilter::exclusive("  a   AND b ");
        assert_eq!(filter.query(), "  a   AND b ");
        assert_eq!(filter.normalized_query(), "a b");
    }
}
