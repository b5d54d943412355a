//! Route derivation from template paths, and the matcher the generated
//! runtime mirrors.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

/// Template file extension
pub const TEMPLATE_EXT: &str = "up";

/// Prefix marking a path segment as a route parameter
const PARAM_PREFIX: char = '$';

lazy_static! {
    static ref SLUG: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Route for a template at `path`, relative to the pages root.
///
/// `about.up` → `/about`, `users/$id.up` → `/users/:id`, an `index`
/// basename contributes no segment but keeps the trailing slash.
pub fn route_for_page(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches("./").trim_matches('/');
    let path = path
        .strip_suffix(TEMPLATE_EXT)
        .and_then(|p| p.strip_suffix('.'))
        .unwrap_or(path);

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let is_index = segments.last() == Some(&"index");
    if is_index {
        segments.pop();
    }

    let mut route = String::from("/");
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            route.push('/');
        }
        match segment.strip_prefix(PARAM_PREFIX) {
            Some(name) => {
                route.push(':');
                route.push_str(name);
            }
            None => route.push_str(segment),
        }
    }
    if is_index && !segments.is_empty() {
        route.push('/');
    }
    route
}

/// Route of a partial: the page route followed by the partial's
/// ancestor-qualified name chain.
pub fn partial_route(page_route: &str, suffix: &str) -> String {
    format!("{}/{}", page_route.trim_end_matches('/'), suffix)
}

/// A compiled route pattern: `/users/:id` matches `/users/42` with `id = "42"`
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pattern: String,
    regex: Regex,
    slugs: Vec<String>,
}

impl RoutePattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::from("^");
        let mut slugs = Vec::new();
        let mut last = 0;
        for caps in SLUG.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            source.push_str(&regex::escape(&pattern[last..whole.start()]));
            source.push_str("([^/]+)");
            slugs.push(name.as_str().to_string());
            last = whole.end();
        }
        source.push_str(&regex::escape(&pattern[last..]));
        source.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&source)?,
            slugs,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    /// Slug values for `path`, or `None` when it does not match
    pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.slugs
                .iter()
                .enumerate()
                .filter_map(|(i, slug)| caps.get(i + 1).map(|m| (slug.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

#[derive(Debug, PartialEq)]
pub enum Resolution<'r, T> {
    Matched {
        target: &'r T,
        pattern: &'r str,
        params: BTreeMap<String, String>,
    },
    /// Permanent redirect to the path without its trailing slash
    Redirect(String),
    NotFound,
}

/// Most-specific-match router over registered patterns
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<(RoutePattern, T)>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn add(&mut self, pattern: &str, target: T) -> Result<(), regex::Error> {
        self.routes.push((RoutePattern::compile(pattern)?, target));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn resolve(&self, path: &str) -> Resolution<'_, T> {
        if let Some((route, target, params)) = self.best_match(path) {
            return Resolution::Matched {
                target,
                pattern: route.pattern(),
                params,
            };
        }

        if let Some(trimmed) = path.strip_suffix('/').filter(|p| !p.is_empty()) {
            if self.best_match(trimmed).is_some() {
                return Resolution::Redirect(trimmed.to_string());
            }
        }

        Resolution::NotFound
    }

    /// Among all matching patterns the one with the fewest slugs wins;
    /// ties go to the first registered.
    fn best_match(&self, path: &str) -> Option<(&RoutePattern, &T, BTreeMap<String, String>)> {
        self.routes
            .iter()
            .filter_map(|(route, target)| route.captures(path).map(|params| (route, target, params)))
            .min_by_key(|(route, _, _)| route.slugs().len())
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}
