mod go;
mod output;
mod runtime;

pub use go::{GoGenerator, mangle};
pub use output::{Mapping, Output, go_string_literal};
pub use runtime::{RUNTIME_FILE_NAME, runtime_support};

use serde::Serialize;

use crate::transform::Page;

/// Generator options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Go package clause of the generated file
    pub package_name: String,
    /// Template path relative to the pages root; drives routes, type names
    /// and `//line` directives
    pub source_path: String,
    pub line_directives: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            package_name: "build".to_string(),
            source_path: "index.up".to_string(),
            line_directives: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteRole {
    Page,
    Partial,
}

/// One routable target of a generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub pattern: String,
    pub role: RouteRole,
    pub type_name: String,
}

/// Generation result
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub code: String,
    pub mappings: Vec<Mapping>,
    pub routes: Vec<RouteEntry>,
}

/// Generator trait - converts a page to code
pub trait Generator {
    fn generate(&self, page: &Page, options: &GenerateOptions) -> GenerateResult;
}
