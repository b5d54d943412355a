//! Page view of a parsed template: the pieces the generator emits
//! separately (imports, the handler, partial targets) pulled out of the
//! document tree.

use std::sync::Arc;

use crate::ast::{Ast, CodeContext, CodeNode, ImportDecl, Node, NodeRef, Span, Visit, inspect_all};
use crate::error::{InvariantError, InvariantKind};

/// Index of a partial in its page's [`PartialTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMeta {
    pub name: String,
    pub span: Span,
    pub parent: Option<PartialId>,
    pub children: Vec<PartialId>,
    /// Ancestor names and this partial's own, joined with `/`
    pub route_suffix: String,
}

/// Arena of the partials on one page. Entries are stored in document
/// (pre-)order, so parents always come before their children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialTree {
    entries: Vec<PartialMeta>,
    roots: Vec<PartialId>,
}

impl PartialTree {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: PartialId) -> &PartialMeta {
        &self.entries[id.0]
    }

    /// Top-level partials, in document order
    pub fn roots(&self) -> &[PartialId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartialId, &PartialMeta)> {
        self.entries.iter().enumerate().map(|(i, meta)| (PartialId(i), meta))
    }

    pub fn find_by_suffix(&self, suffix: &str) -> Option<PartialId> {
        self.iter().find(|(_, meta)| meta.route_suffix == suffix).map(|(id, _)| id)
    }

    /// Siblings share a parent; `None` means the page's top level.
    fn sibling_named(&self, parent: Option<PartialId>, name: &str) -> Option<PartialId> {
        let siblings = match parent {
            Some(id) => &self.entries[id.0].children,
            None => &self.roots,
        };
        siblings.iter().copied().find(|id| self.entries[id.0].name == name)
    }

    fn insert(&mut self, name: &str, span: Span, parent: Option<PartialId>) -> PartialId {
        let id = PartialId(self.entries.len());
        let route_suffix = match parent {
            Some(p) => format!("{}/{}", self.entries[p.0].route_suffix, name),
            None => name.to_string(),
        };
        self.entries.push(PartialMeta {
            name: name.to_string(),
            span,
            parent,
            children: Vec::new(),
            route_suffix,
        });
        match parent {
            Some(p) => self.entries[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }
}

/// A template restructured for generation
#[derive(Debug, Clone)]
pub struct Page {
    pub imports: Vec<ImportDecl>,
    pub handler: Option<CodeNode>,
    /// Top-level nodes minus imports and the handler
    pub nodes: Vec<Node>,
    pub partials: PartialTree,
    pub source: Arc<str>,
}

impl Page {
    pub fn from_ast(ast: Ast) -> Result<Page, InvariantError> {
        let source = ast.source;
        let mut imports = Vec::new();
        let mut partials = PartialTree::default();
        let mut handler_span: Option<Span> = None;
        let mut first_error: Option<InvariantError> = None;

        {
            // One entry per entered node; `Some` for partials
            let mut stack: Vec<Option<PartialId>> = Vec::new();
            let mut record = |err: InvariantError| {
                first_error.get_or_insert(err);
            };

            inspect_all(&ast.nodes, &mut |visit| {
                let node = match visit {
                    Visit::Enter(node) => node,
                    Visit::Exit => {
                        stack.pop();
                        return true;
                    }
                };

                let mut entry = None;
                match node {
                    NodeRef::Import(import) => imports.push(import.decl.clone()),
                    NodeRef::Code(code) if code.context == CodeContext::Handler => {
                        if !stack.is_empty() {
                            record(InvariantError::new(
                                InvariantKind::NestedHandler,
                                "^handler must be declared at the top level of the page",
                                code.span,
                                &source,
                            ));
                        } else if let Some(first) = handler_span {
                            record(
                                InvariantError::new(
                                    InvariantKind::DuplicateHandler,
                                    "a page can only have one ^handler block",
                                    code.span,
                                    &source,
                                )
                                .with_related(first),
                            );
                        } else {
                            handler_span = Some(code.span);
                        }
                    }
                    NodeRef::Partial(partial) => {
                        let parent = stack.iter().rev().find_map(|entry| *entry);
                        if let Some(existing) = partials.sibling_named(parent, &partial.name) {
                            record(
                                InvariantError::new(
                                    InvariantKind::DuplicatePartial,
                                    format!("duplicate partial name '{}'", partial.name),
                                    partial.span,
                                    &source,
                                )
                                .with_related(partials.get(existing).span),
                            );
                        }
                        entry = Some(partials.insert(&partial.name, partial.span, parent));
                    }
                    _ => {}
                }

                stack.push(entry);
                true
            });
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let mut handler = None;
        let mut nodes = Vec::with_capacity(ast.nodes.len());
        for node in ast.nodes {
            match node {
                Node::Import(_) => {}
                Node::Code(code) if code.context == CodeContext::Handler => handler = Some(code),
                other => nodes.push(other),
            }
        }

        tracing::debug!(
            imports = imports.len(),
            partials = partials.len(),
            has_handler = handler.is_some(),
            "page assembled"
        );

        Ok(Page {
            imports,
            handler,
            nodes,
            partials,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, UpParser};

    fn page(source: &str) -> Result<Page, InvariantError> {
        Page::from_ast(UpParser::new().parse(source).unwrap())
    }

    #[test]
    fn test_splits_imports_and_handler_from_body() {
        let page = page("^import \"strings\"\n^handler { n := 1 }\n<p>^n</p>").unwrap();
        assert_eq!(page.imports.len(), 1);
        assert_eq!(page.imports[0].path, "strings");
        assert_eq!(page.handler.as_ref().map(|h| h.code.as_str()), Some(" n := 1 "));
        assert!(page.nodes.iter().all(|n| !matches!(n, Node::Import(_) | Node::Code(_))));
    }

    #[test]
    fn test_collects_nested_imports() {
        let page = page("<div>^import \"fmt\"</div>").unwrap();
        assert_eq!(page.imports[0].path, "fmt");
    }

    #[test]
    fn test_second_handler_is_invariant_error() {
        let source = "^handler { a() }\n^handler { b() }";
        let err = page(source).unwrap_err();
        assert_eq!(err.kind, InvariantKind::DuplicateHandler);
        assert_eq!(err.line, 2);
        assert_eq!(err.related_span, Some(Span::new(10, 15)));
    }

    #[test]
    fn test_nested_handler_is_invariant_error() {
        let err = page("<div>^handler { a() }</div>").unwrap_err();
        assert_eq!(err.kind, InvariantKind::NestedHandler);
        assert_eq!(err.to_string(), "1:16: ^handler must be declared at the top level of the page");
    }

    #[test]
    fn test_partial_tree_links_parents() {
        let source = "<div>^partial outer { <ul>^partial inner { <li></li> }</ul> }^partial side { <p></p> }</div>";
        let page = page(source).unwrap();
        let tree = &page.partials;
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), [PartialId(0), PartialId(2)]);

        let inner = tree.get(PartialId(1));
        assert_eq!(inner.name, "inner");
        assert_eq!(inner.parent, Some(PartialId(0)));
        assert_eq!(inner.route_suffix, "outer/inner");
        assert_eq!(tree.get(PartialId(0)).children, [PartialId(1)]);
        assert_eq!(tree.find_by_suffix("side"), Some(PartialId(2)));
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let source = "^partial a { <p>^partial x { <b></b> }</p> }^partial b { <p>^partial x { <i></i> }</p> }";
        let page = page(source).unwrap();
        let suffixes: Vec<&str> = page.partials.iter().map(|(_, m)| m.route_suffix.as_str()).collect();
        assert_eq!(suffixes, ["a", "a/x", "b", "b/x"]);
    }

    #[test]
    fn test_duplicate_sibling_partial_rejected() {
        let source = "^partial a { <p></p> }\n^partial a { <i></i> }";
        let err = page(source).unwrap_err();
        assert_eq!(err.kind, InvariantKind::DuplicatePartial);
        assert_eq!(err.message, "duplicate partial name 'a'");
        assert_eq!(err.line, 2);
        assert_eq!(err.related_span.map(|s| s.start), Some(0));
    }
}
