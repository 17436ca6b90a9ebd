//! Path templates.
//!
//! A pattern is a `/`-separated list of segments. Each segment is either a
//! literal, compared byte-for-byte, or a `{name}` parameter that matches
//! exactly one non-empty path segment. There is no prefix or glob matching:
//! a pattern only matches a path with the same number of segments.

use std::fmt;

/// Reasons a path template is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("unbalanced or misplaced brace in segment `{0}`")]
    UnbalancedBrace(String),

    #[error("empty parameter name in segment `{0}`")]
    EmptyParameter(String),

    #[error("invalid parameter name `{0}`")]
    InvalidParameterName(String),

    #[error("parameter `{0}` appears more than once")]
    DuplicateParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a template such as `/delete-document/{document_id}`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw.strip_prefix('/').ok_or(PatternError::MissingLeadingSlash)?;

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            segments.push(parse_segment(segment)?);
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(PatternError::DuplicateParameter(name.clone()));
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the template contains no `{name}` segments.
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Parameter names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning the captured parameters.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut params = PathParams::default();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push(name.clone(), part.to_string());
                }
            }
        }

        // Trailing segments mean the path is longer than the template.
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(segment: &str) -> Result<Segment, PatternError> {
    let has_open = segment.contains('{');
    let has_close = segment.contains('}');
    if !has_open && !has_close {
        return Ok(Segment::Literal(segment.to_string()));
    }

    let name = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| PatternError::UnbalancedBrace(segment.to_string()))?;

    if name.contains('{') || name.contains('}') {
        return Err(PatternError::UnbalancedBrace(segment.to_string()));
    }
    if name.is_empty() {
        return Err(PatternError::EmptyParameter(segment.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(PatternError::InvalidParameterName(name.to_string()));
    }
    Ok(Segment::Param(name.to_string()))
}

/// Parameters captured from a templated path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern() {
        let p = PathPattern::parse("/analyze-document").unwrap();
        assert!(p.is_literal());
        assert!(p.captures("/analyze-document").unwrap().is_empty());
        assert!(p.captures("/analyze-document/").is_none());
        assert!(p.captures("/analyze").is_none());
    }

    #[test]
    fn template_captures_one_segment() {
        let p = PathPattern::parse("/delete-document/{document_id}").unwrap();
        assert!(!p.is_literal());
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["document_id"]);

        let params = p.captures("/delete-document/42").unwrap();
        assert_eq!(params.get("document_id"), Some("42"));

        // No prefix matching, no empty segments, no slashes inside a parameter.
        assert!(p.captures("/delete-document").is_none());
        assert!(p.captures("/delete-document/").is_none());
        assert!(p.captures("/delete-document/42/extra").is_none());
    }

    #[test]
    fn multiple_parameters() {
        let p = PathPattern::parse("/users/{user}/docs/{doc}").unwrap();
        let params = p.captures("/users/ada/docs/7").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("user"), Some("ada"));
        assert_eq!(params.get("doc"), Some("7"));
        assert!(p.captures("/users/ada/files/7").is_none());
    }

    #[test]
    fn root_pattern() {
        let p = PathPattern::parse("/").unwrap();
        assert!(p.captures("/").is_some());
        assert!(p.captures("/x").is_none());
    }

    #[test]
    fn malformed_patterns() {
        assert_eq!(
            PathPattern::parse("search"),
            Err(PatternError::MissingLeadingSlash)
        );
        assert!(matches!(
            PathPattern::parse("/docs/{id"),
            Err(PatternError::UnbalancedBrace(_))
        ));
        assert!(matches!(
            PathPattern::parse("/docs/id}"),
            Err(PatternError::UnbalancedBrace(_))
        ));
        assert!(matches!(
            PathPattern::parse("/docs/prefix-{id}"),
            Err(PatternError::UnbalancedBrace(_))
        ));
        assert!(matches!(
            PathPattern::parse("/docs/{}"),
            Err(PatternError::EmptyParameter(_))
        ));
        assert!(matches!(
            PathPattern::parse("/docs/{a b}"),
            Err(PatternError::InvalidParameterName(_))
        ));
        assert_eq!(
            PathPattern::parse("/{id}/x/{id}"),
            Err(PatternError::DuplicateParameter("id".into()))
        );
    }
}
