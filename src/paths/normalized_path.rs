use std::fmt;

/// Separator used by the remote service for its virtual paths.
const SEPARATOR: char = '\\';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// A path string with a single canonical separator and no leading or
/// trailing separators.
///
/// Local paths and remote virtual paths are only comparable after both have
/// been normalized, so every equality check between the two goes through
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split(is_separator)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        NormalizedPath(normalized)
    }

    /// Appends `segment` (which may itself contain separators) to this path.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        let segment = NormalizedPath::new(segment);
        match (self.is_empty(), segment.is_empty()) {
            (true, _) => segment,
            (_, true) => self.clone(),
            _ => NormalizedPath(format!("{}{}{}", self.0, SEPARATOR, segment.0)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("a/b/c", "a\\b\\c")]
    #[case("a\\b\\c", "a\\b\\c")]
    #[case("\\a\\b\\c\\", "a\\b\\c")]
    #[case("//a///b//", "a\\b")]
    #[case("/\\/mixed\\/seps/", "mixed\\seps")]
    #[case("", "")]
    #[case("///", "")]
    #[case("root\\variance\\abc\\a.txt", "root\\variance\\abc\\a.txt")]
    #[case("name with spaces/file.txt", "name with spaces\\file.txt")]
    fn normalizes_separators(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(NormalizedPath::new(input).as_str(), expected);
    }

    #[rstest]
    #[case("a/b/c")]
    #[case("\\\\a//b\\c\\")]
    #[case("")]
    #[case("/")]
    #[case("root\\variance/hash//file.txt")]
    fn normalization_is_idempotent(#[case] input: &str) {
        let once = NormalizedPath::new(input);
        let twice = NormalizedPath::new(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn equivalent_spellings_compare_equal() {
        let forward = NormalizedPath::new("a/b/c");
        let backward = NormalizedPath::new("a\\b\\c");
        let wrapped = NormalizedPath::new("\\a\\b\\c\\");
        assert_eq!(forward, backward);
        assert_eq!(backward, wrapped);
    }

    #[test]
    fn join_inserts_single_separator() {
        let root = NormalizedPath::new("root");
        assert_eq!(
            root.join("variance/abc/a.txt").as_str(),
            "root\\variance\\abc\\a.txt"
        );
        assert_eq!(root.join("/nested/").as_str(), "root\\nested");
    }

    #[test]
    fn join_with_empty_sides() {
        let empty = NormalizedPath::default();
        assert_eq!(empty.join("a/b").as_str(), "a\\b");
        assert_eq!(NormalizedPath::new("a").join("").as_str(), "a");
    }
}
