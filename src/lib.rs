//! Compiler for `.up` templates: HTML interleaved with `^`-prefixed Go,
//! compiled to Go source that serves each page (and each of its partials)
//! as a `net/http` handler.
//!
//! ```text
//! source ─▶ parser ─▶ Ast ─▶ transform (coalesce) ─▶ Page ─▶ generate ─▶ Go + routes
//! ```

pub mod ast;
pub mod error;
pub mod generate;
pub mod html;
pub mod parser;
pub mod routes;
pub mod transform;

use std::time::Instant;

pub use ast::{Ast, Node, Span};
pub use error::{CompileError, ErrorKind, InvariantError, InvariantKind, ParseError};
pub use generate::{GenerateOptions, GenerateResult, Generator, GoGenerator, Mapping, RouteEntry, RouteRole};
pub use parser::{Parser, UpParser};
pub use transform::{Page, Transformer};

/// Parse, optimize and generate in one place
pub struct Pipeline {
    parser: UpParser,
    transformer: Transformer,
    generator: GoGenerator,
}

impl Pipeline {
    /// Parser, literal coalescing and the Go generator
    pub fn standard() -> Self {
        Self {
            parser: UpParser::new(),
            transformer: transform::standard_plugins(),
            generator: GoGenerator::new(),
        }
    }

    /// Raw AST, before any transformation
    pub fn parse(&self, source: &str) -> Result<Ast, ParseError> {
        self.parser.parse(source)
    }

    /// AST after the standard transformations
    pub fn optimize(&mut self, source: &str) -> Result<Ast, ParseError> {
        let mut ast = self.parse(source)?;
        self.transformer.transform(&mut ast);
        Ok(ast)
    }

    pub fn compile(&mut self, source: &str, options: &GenerateOptions) -> Result<GenerateResult, CompileError> {
        let started = Instant::now();

        let ast = self.optimize(source)?;
        tracing::debug!(file = %options.source_path, nodes = ast.nodes.len(), "parsed");

        let page = Page::from_ast(ast)?;
        let result = self.generator.generate(&page, options);

        tracing::debug!(
            file = %options.source_path,
            elapsed_us = started.elapsed().as_micros() as u64,
            "compiled"
        );
        Ok(result)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
