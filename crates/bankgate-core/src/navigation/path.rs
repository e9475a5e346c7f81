use std::fmt;

/// A route path reduced to its segments.
///
/// Parsing strips leading/trailing separators, the query component and any
/// fragment, so `/reports/summary?tab=2` and `reports/summary/` compare equal.
/// Prefix checks work on whole segments: `reports2` is not under `reports`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoutePath {
    segments: Vec<String>,
}

impl RoutePath {
    pub fn parse(raw: &str) -> Self {
        let without_query = raw.split(['?', '#']).next().unwrap_or_default();
        let segments = without_query
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the empty path (`""`, `"/"`, `"?x=1"`).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Equal to `prefix` or a strict descendant of it, segment by segment.
    pub fn starts_with(&self, prefix: &RoutePath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
    }

    /// The path one level up; `None` for the root.
    pub fn parent(&self) -> Option<RoutePath> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for RoutePath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators_query_and_fragment() {
        let path = RoutePath::parse("//dashboard/neft/?tab=history#top");
        assert_eq!(path.segments(), ["dashboard", "neft"]);
        assert_eq!(path.to_string(), "dashboard/neft");
    }

    #[test]
    fn test_root_forms() {
        assert!(RoutePath::parse("").is_root());
        assert!(RoutePath::parse("/").is_root());
        assert!(RoutePath::parse("/?sessionExpired=true").is_root());
    }

    #[test]
    fn test_prefix_is_segment_based() {
        let reports = RoutePath::parse("reports");
        assert!(RoutePath::parse("reports").starts_with(&reports));
        assert!(RoutePath::parse("reports/summary").starts_with(&reports));
        assert!(!RoutePath::parse("reports2").starts_with(&reports));
        assert!(!RoutePath::parse("report").starts_with(&reports));
    }

    #[test]
    fn test_parent() {
        assert_eq!(
            RoutePath::parse("reports/summary").parent(),
            Some(RoutePath::parse("reports"))
        );
        assert_eq!(RoutePath::parse("reports").parent(), Some(RoutePath::default()));
        assert_eq!(RoutePath::default().parent(), None);
    }
}
