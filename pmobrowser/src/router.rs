//! Path router
//!
//! Matches a path against a set of route patterns and extracts parameters.
//! Patterns are `/`-separated segments where each segment is one of:
//!
//! - a literal (`artists`), matched exactly;
//! - a parameter (`{id}`), matching any single non-empty segment;
//! - `*`, matching exactly one segment without binding it;
//! - `**` (last segment only), matching one or more segments and binding the
//!   remainder to the `tail` parameter.
//!
//! When several patterns match, the most specific wins: more literal segments
//! first, then more total segments, then fewer wildcards.

use crate::error::{BrowserError, Result};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

/// Parameter bound by a trailing `**`
pub const TAIL_PARAM: &str = "tail";

/// Synthetic path prefix under which search results are cached
pub const SEARCH_PATH: &str = "/__search";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
    Tail,
}

/// A compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Specificity of a match, greater is more specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Specificity {
    literals: usize,
    segments: usize,
    wildcards: Reverse<usize>,
}

/// Result of a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// The pattern as written in the route table
    pub pattern: String,
    /// Bound `{name}` parameters, plus `tail` for `**` patterns
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    /// Remainder matched by a trailing `**`
    pub fn tail(&self) -> Option<&str> {
        self.params.get(TAIL_PARAM).map(String::as_str)
    }
}

impl RoutePattern {
    /// Compiles a pattern string
    ///
    /// Fails when `**` is not the last segment or a parameter has no name.
    pub fn parse(pattern: &str) -> Result<Self> {
        let parts = split_segments(pattern);
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if index + 1 != parts.len() => {
                    return Err(BrowserError::Configuration(format!(
                        "'**' must be the last segment in route '{}'",
                        pattern
                    )));
                }
                "**" => Segment::Tail,
                "*" => Segment::Wildcard,
                p if p.starts_with('{') && p.ends_with('}') => {
                    let name = &p[1..p.len() - 1];
                    if name.is_empty() {
                        return Err(BrowserError::Configuration(format!(
                            "unnamed parameter in route '{}'",
                            pattern
                        )));
                    }
                    Segment::Param(name.to_string())
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Shape of the pattern with parameter names erased
    ///
    /// Two patterns with the same shape match exactly the same paths.
    pub fn shape(&self) -> String {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(s) => s.as_str(),
                Segment::Param(_) => "{}",
                Segment::Wildcard => "*",
                Segment::Tail => "**",
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    fn specificity(&self) -> Specificity {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let wildcards = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard | Segment::Tail))
            .count();

        Specificity {
            literals,
            segments: self.segments.len(),
            wildcards: Reverse(wildcards),
        }
    }

    /// Matches the pattern against already split path segments
    fn match_segments(&self, path: &[&str]) -> Option<HashMap<String, String>> {
        let has_tail = matches!(self.segments.last(), Some(Segment::Tail));
        let fixed = if has_tail {
            self.segments.len() - 1
        } else {
            self.segments.len()
        };

        if has_tail {
            // '**' needs at least one remaining segment
            if path.len() <= fixed {
                return None;
            }
        } else if path.len() != fixed {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, value) in self.segments[..fixed].iter().zip(path) {
            match segment {
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*value).to_string());
                }
                Segment::Wildcard => {}
                Segment::Tail => unreachable!("tail is always last"),
            }
        }

        if has_tail {
            params.insert(TAIL_PARAM.to_string(), path[fixed..].join("/"));
        }

        Some(params)
    }

    /// Matches a full path (query string ignored)
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let path = normalize_path(path);
        self.match_segments(&split_segments(path_only(&path)))
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Finds the most specific pattern matching `path`
///
/// An empty path is treated as `/`. The query string is not part of the match.
pub fn find_best_match<'a, I>(path: &str, patterns: I) -> Option<RouteMatch>
where
    I: IntoIterator<Item = &'a RoutePattern>,
{
    let path = normalize_path(path);
    let segments = split_segments(path_only(&path));

    patterns
        .into_iter()
        .filter_map(|pattern| {
            pattern
                .match_segments(&segments)
                .map(|params| (pattern.specificity(), pattern, params))
        })
        .max_by(|(a, pa, _), (b, pb, _)| a.cmp(b).then_with(|| pb.raw.cmp(&pa.raw)))
        .map(|(_, pattern, params)| RouteMatch {
            pattern: pattern.raw.clone(),
            params,
        })
}

/// Empty paths default to `/`
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Path component without its query string
pub fn path_only(path: &str) -> &str {
    path.split_once('?').map(|(p, _)| p).unwrap_or(path)
}

/// Decoded query parameters of a path, the reserved `__trackId` included
pub fn query_params(path: &str) -> HashMap<String, String> {
    let Some((_, query)) = path.split_once('?') else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

/// Synthetic path under which the results of `query` are cached
pub fn search_path(query: &str) -> String {
    format!("{}?q={}", SEARCH_PATH, urlencoding::encode(query))
}

/// Returns `true` for synthetic search paths
pub fn is_search_path(path: &str) -> bool {
    path_only(path) == SEARCH_PATH
}

/// Search query carried by a synthetic search path
pub fn search_query(path: &str) -> Option<String> {
    if !is_search_path(path) {
        return None;
    }
    query_params(path).remove("q")
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
