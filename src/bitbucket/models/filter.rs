//! Branch name filter rendered as a Bitbucket query.

/// Restricts a branch listing to the given names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchFilter {
    names: Vec<String>,
}

impl BranchFilter {
    /// Creates a filter from branch names, dropping blanks and duplicates.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let trimmed = name.as_ref().trim();
            if !trimmed.is_empty() && !unique.iter().any(|existing| existing == trimmed) {
                unique.push(trimmed.to_owned());
            }
        }
        Self { names: unique }
    }

    /// Parses a comma-separated list such as `main, develop`.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// The branch names in the filter.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the filter names no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Query expression, such as `(name="main" OR name="develop")`.
    ///
    /// Returns `None` for an empty filter.
    #[must_use]
    pub fn query(&self) -> Option<String> {
        if self.names.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .names
            .iter()
            .map(|name| format!("name=\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        Some(format!("({})", clauses.join(" OR ")))
    }
}
