//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Split a route template into literal, `:param` and `*catch_all` segments
//! - Match a concrete request path and bind parameter values
//! - Rank patterns so the most specific one wins when several match
//!
//! # Design Decisions
//! - Case-sensitive, byte-for-byte literal comparison
//! - Captured values are bound verbatim (no percent-decoding)
//! - One linear pass per pattern, no backtracking

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::routing::error::PatternError;

/// Parameter values bound by a successful match, keyed by parameter name.
pub type PathParams = HashMap<String, String>;

/// One compiled segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// `:name`, binds exactly one non-empty segment.
    Param(String),
    /// `*name`, binds every remaining segment joined by `/`.
    CatchAll(String),
}

impl Segment {
    // Lower rank = more specific.
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Param(_) => 1,
            Segment::CatchAll(_) => 2,
        }
    }

    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            (Segment::CatchAll(_), Segment::CatchAll(_)) => true,
            _ => false,
        }
    }
}

/// A compiled route template such as `/items/:category/id/:item_id`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a route template.
    ///
    /// `/` compiles to zero segments and only matches the root path.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(pattern.to_string()))?;

        let mut segments = Vec::new();
        if rest.is_empty() {
            return Ok(Self {
                raw: pattern.to_string(),
                segments,
            });
        }

        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len() - 1;
        let mut seen = HashSet::new();

        for (position, part) in parts.into_iter().enumerate() {
            let segment = if part.is_empty() {
                return Err(PatternError::EmptySegment {
                    pattern: pattern.to_string(),
                    position,
                });
            } else if let Some(name) = part.strip_prefix(':') {
                Segment::Param(Self::param_name(pattern, name)?)
            } else if let Some(name) = part.strip_prefix('*') {
                let name = Self::param_name(pattern, name)?;
                if position != last {
                    return Err(PatternError::CatchAllNotLast {
                        pattern: pattern.to_string(),
                        name,
                    });
                }
                Segment::CatchAll(name)
            } else {
                Segment::Literal(part.to_string())
            };

            if let Segment::Param(name) | Segment::CatchAll(name) = &segment {
                if !seen.insert(name.clone()) {
                    return Err(PatternError::DuplicateParam {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    fn param_name(pattern: &str, name: &str) -> Result<String, PatternError> {
        if name.is_empty() {
            return Err(PatternError::EmptyParamName {
                pattern: pattern.to_string(),
            });
        }
        Ok(name.to_string())
    }

    /// Match a request path, returning the bound parameters on success.
    ///
    /// Segment counts must agree exactly unless the pattern ends in a
    /// catch-all, which needs at least one remaining segment.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        let mut params = PathParams::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if *parts.get(index)? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(index)?;
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), (*part).to_string());
                }
                Segment::CatchAll(name) => {
                    let remaining = parts.get(index..).unwrap_or_default();
                    if remaining.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), remaining.join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Order two patterns by specificity; `Less` means `self` is more specific.
    ///
    /// The first differing segment decides (literal < param < catch-all); on a
    /// common prefix the longer pattern wins.
    pub fn specificity_cmp(&self, other: &PathPattern) -> Ordering {
        for (mine, theirs) in self.segments.iter().zip(&other.segments) {
            match mine.rank().cmp(&theirs.rank()) {
                Ordering::Equal => continue,
                decided => return decided,
            }
        }
        other.segments.len().cmp(&self.segments.len())
    }

    /// True when both patterns match exactly the same set of paths
    /// (parameter names are ignored).
    pub fn same_shape(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    /// True when the pattern has no parameter slots.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn compile_classifies_segments() {
        let pattern = PathPattern::compile("/items/:category/id/:item_id").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("items".into()),
                Segment::Param("category".into()),
                Segment::Literal("id".into()),
                Segment::Param("item_id".into()),
            ]
        );
        assert!(!pattern.is_static());
        assert!(PathPattern::compile("/users/profile").unwrap().is_static());
    }

    #[test]
    fn compile_rejects_bad_templates() {
        assert!(matches!(
            PathPattern::compile("users"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            PathPattern::compile("/a//b"),
            Err(PatternError::EmptySegment { position: 1, .. })
        ));
        assert!(matches!(
            PathPattern::compile("/users/"),
            Err(PatternError::EmptySegment { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/users/:"),
            Err(PatternError::EmptyParamName { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
        assert!(matches!(
            PathPattern::compile("/files/*rest/tail"),
            Err(PatternError::CatchAllNotLast { .. })
        ));
    }

    #[test]
    fn root_matches_only_root() {
        let root = PathPattern::compile("/").unwrap();
        assert_eq!(root.matches("/"), Some(PathParams::new()));
        assert_eq!(root.matches("/hello"), None);
    }

    #[test]
    fn literal_match_is_exact_and_case_sensitive() {
        let pattern = PathPattern::compile("/hello").unwrap();
        assert!(pattern.matches("/hello").is_some());
        assert!(pattern.matches("/Hello").is_none());
        assert!(pattern.matches("/hello/world").is_none());
        assert!(pattern.matches("/hello/").is_none());
    }

    #[test]
    fn params_bind_verbatim() {
        let pattern = PathPattern::compile("/items/:category/id/:item_id").unwrap();
        assert_eq!(
            pattern.matches("/items/book/id/456"),
            Some(params(&[("category", "book"), ("item_id", "456")]))
        );
        assert_eq!(
            pattern.matches("/items/a%20b/id/1"),
            Some(params(&[("category", "a%20b"), ("item_id", "1")]))
        );
        assert!(pattern.matches("/items/book/id").is_none());
        assert!(pattern.matches("/items//id/1").is_none());
    }

    #[test]
    fn catch_all_takes_the_rest() {
        let pattern = PathPattern::compile("/files/*filepath").unwrap();
        assert_eq!(
            pattern.matches("/files/a/b/c.txt"),
            Some(params(&[("filepath", "a/b/c.txt")]))
        );
        assert_eq!(
            pattern.matches("/files/readme"),
            Some(params(&[("filepath", "readme")]))
        );
        assert!(pattern.matches("/files").is_none());
    }

    #[test]
    fn matching_is_repeatable() {
        let pattern = PathPattern::compile("/users/:id").unwrap();
        let first = pattern.matches("/users/42");
        let second = pattern.matches("/users/42");
        assert_eq!(first, second);
        assert_eq!(first, Some(params(&[("id", "42")])));
    }

    #[test]
    fn literal_beats_param_beats_catch_all() {
        let literal = PathPattern::compile("/users/profile").unwrap();
        let param = PathPattern::compile("/users/:id").unwrap();
        let catch_all = PathPattern::compile("/users/*rest").unwrap();

        assert_eq!(literal.specificity_cmp(&param), Ordering::Less);
        assert_eq!(param.specificity_cmp(&literal), Ordering::Greater);
        assert_eq!(param.specificity_cmp(&catch_all), Ordering::Less);

        let deeper = PathPattern::compile("/users/:id/*rest").unwrap();
        assert_eq!(deeper.specificity_cmp(&catch_all), Ordering::Less);
    }

    #[test]
    fn shape_ignores_param_names() {
        let a = PathPattern::compile("/users/:id").unwrap();
        let b = PathPattern::compile("/users/:uid").unwrap();
        let c = PathPattern::compile("/users/profile").unwrap();
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }
}
