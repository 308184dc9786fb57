//! URI template expansion for Bitbucket endpoints.
//!
//! Supports the subset of RFC 6570 the client uses: simple `{var}`, reserved
//! `{+var}`, path segments `{/a,b}`, and form-style queries `{?a,b}` /
//! `{&a}`. Variables that were never set are omitted from the expansion, so
//! optional query parameters simply disappear.

use std::fmt::Display;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::error::{BitbucketError, Result};

/// Characters left untouched by simple, path, and query expansion.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Reserved expansion additionally keeps the path-safe reserved characters.
/// `?`, `#`, `[` and `]` stay encoded so a value cannot start a query or
/// fragment.
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    PathSegment,
    Query,
    QueryContinuation,
}

impl Operator {
    fn split(expression: &str) -> (Self, &str) {
        let tail = || expression.get(1..).unwrap_or_default();
        match expression.chars().next() {
            Some('+') => (Self::Reserved, tail()),
            Some('/') => (Self::PathSegment, tail()),
            Some('?') => (Self::Query, tail()),
            Some('&') => (Self::QueryContinuation, tail()),
            _ => (Self::Simple, expression),
        }
    }
}

/// A URI template with ordered variable assignments.
///
/// # Example
///
/// ```
/// use bitbucket_cloud::bitbucket::template::UriTemplate;
///
/// let url = UriTemplate::new("/2.0/repositories{/owner,repo}/refs/branches{?pagelen,q}")
///     .set("owner", "acme")
///     .set("repo", "rocket")
///     .set("pagelen", 100)
///     .expand()
///     .expect("template should expand");
/// assert_eq!(url, "/2.0/repositories/acme/rocket/refs/branches?pagelen=100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
    variables: Vec<(String, String)>,
}

impl UriTemplate {
    /// Creates a template with no variables assigned.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: Vec::new(),
        }
    }

    /// Assigns a variable, replacing any earlier value for the same name.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Display) -> Self {
        let rendered = value.to_string();
        if let Some(slot) = self
            .variables
            .iter_mut()
            .find(|(existing, _)| existing == name)
        {
            slot.1 = rendered;
        } else {
            self.variables.push((name.to_owned(), rendered));
        }
        self
    }

    /// Assigns a variable only when a value is present.
    #[must_use]
    pub fn set_optional(self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(present) => self.set(name, present),
            None => self,
        }
    }

    /// Expands the template into a string.
    ///
    /// # Errors
    ///
    /// Returns [`BitbucketError::InvalidRequest`] when an expression is not
    /// terminated by a closing brace.
    pub fn expand(&self) -> Result<String> {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            output.push_str(literal);

            let close = tail.find('}').ok_or_else(|| BitbucketError::InvalidRequest {
                message: format!("unterminated expression in URI template `{}`", self.template),
            })?;
            let expression = tail.get(1..close).unwrap_or_default();
            self.expand_expression(expression, &mut output);
            rest = tail.get(close + 1..).unwrap_or_default();
        }

        output.push_str(rest);
        Ok(output)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    fn expand_expression(&self, expression: &str, output: &mut String) {
        let (operator, names) = Operator::split(expression);
        let defined = names
            .split(',')
            .map(str::trim)
            .filter_map(|name| self.value(name).map(|value| (name, value)));

        let mut first = true;
        for (name, value) in defined {
            match operator {
                Operator::Simple | Operator::Reserved => {
                    if !first {
                        output.push(',');
                    }
                    let set = if operator == Operator::Reserved {
                        RESERVED
                    } else {
                        UNRESERVED
                    };
                    output.extend(utf8_percent_encode(value, set));
                }
                Operator::PathSegment => {
                    output.push('/');
                    output.extend(utf8_percent_encode(value, UNRESERVED));
                }
                Operator::Query | Operator::QueryContinuation => {
                    let separator = if first && operator == Operator::Query {
                        '?'
                    } else {
                        '&'
                    };
                    output.push(separator);
                    output.push_str(name);
                    output.push('=');
                    output.extend(utf8_percent_encode(value, UNRESERVED));
                }
            }
            first = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::UriTemplate;
    use crate::bitbucket::error::BitbucketError;

    #[rstest]
    fn expands_path_segments_in_order() {
        let expanded = UriTemplate::new("/2.0/repositories{/owner,repo}/pullrequests{/id}")
            .set("owner", "acme")
            .set("repo", "rocket")
            .set("id", 42)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, "/2.0/repositories/acme/rocket/pullrequests/42");
    }

    #[rstest]
    fn omits_unset_query_parameters() {
        let expanded = UriTemplate::new("/2.0/repositories{/owner}{?role,pagelen}")
            .set("owner", "acme")
            .set("pagelen", 100)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, "/2.0/repositories/acme?pagelen=100");
    }

    #[rstest]
    fn encodes_query_values() {
        let expanded = UriTemplate::new("/branches{?q}")
            .set("q", "(name=\"master\" OR name=\"dev\")")
            .expand()
            .expect("template should expand");

        assert_eq!(
            expanded,
            "/branches?q=%28name%3D%22master%22%20OR%20name%3D%22dev%22%29"
        );
    }

    #[rstest]
    #[case::simple("/src/{path}", "/src/docs%2Fread%20me.md")]
    #[case::reserved("/src/{+path}", "/src/docs/read%20me.md")]
    #[case::segment("/src{/path}", "/src/docs%2Fread%20me.md")]
    fn path_operators_differ_in_slash_handling(#[case] template: &str, #[case] expected: &str) {
        let expanded = UriTemplate::new(template)
            .set("path", "docs/read me.md")
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, expected);
    }

    #[rstest]
    #[case::delimiters("/src/{+path}", "a:b@c/d;e=f,g+h(1)!$&'*", "/src/a:b@c/d;e=f,g+h(1)!$&'*")]
    #[case::structural("/src/{+path}", "x?y#z[0]", "/src/x%3Fy%23z%5B0%5D")]
    #[case::simple_encodes("/src/{path}", "a:b@c", "/src/a%3Ab%40c")]
    fn reserved_expansion_keeps_sub_delimiters(
        #[case] template: &str,
        #[case] value: &str,
        #[case] expected: &str,
    ) {
        let expanded = UriTemplate::new(template)
            .set("path", value)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, expected);
    }

    #[rstest]
    fn continuation_appends_to_existing_query() {
        let expanded = UriTemplate::new("/hooks?fields=values{&pagelen}")
            .set("pagelen", 10)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, "/hooks?fields=values&pagelen=10");
    }

    #[rstest]
    fn later_assignment_replaces_earlier_value() {
        let expanded = UriTemplate::new("/x{?page}")
            .set("page", 1)
            .set("page", 2)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, "/x?page=2");
    }

    #[rstest]
    fn set_optional_skips_missing_values() {
        let expanded = UriTemplate::new("/x{?role}")
            .set_optional("role", None::<&str>)
            .expand()
            .expect("template should expand");

        assert_eq!(expanded, "/x");
    }

    #[rstest]
    fn rejects_unterminated_expression() {
        let result = UriTemplate::new("/x{/owner").set("owner", "acme").expand();

        assert!(
            matches!(result, Err(BitbucketError::InvalidRequest { .. })),
            "expected InvalidRequest, got {result:?}"
        );
    }
}
