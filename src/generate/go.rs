use super::{GenerateOptions, GenerateResult, Generator, Output, RouteEntry, RouteRole, go_string_literal};
use crate::ast::*;
use crate::html::is_text_element;
use crate::parser::positions::LineIndex;
use crate::routes::{partial_route, route_for_page};
use crate::transform::{Page, PartialId};

/// Emits one Go file per page: a type per routable target and its
/// `Respond` method.
pub struct GoGenerator;

impl GoGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for GoGenerator {
    fn generate(&self, page: &Page, options: &GenerateOptions) -> GenerateResult {
        let page_route = route_for_page(&options.source_path);
        let base = mangle(strip_template_ext(&options.source_path));

        let mut routes = vec![RouteEntry {
            pattern: page_route.clone(),
            role: RouteRole::Page,
            type_name: format!("UpPage_{base}"),
        }];
        let mut targets = vec![None];
        for (id, meta) in page.partials.iter() {
            routes.push(RouteEntry {
                pattern: partial_route(&page_route, &meta.route_suffix),
                role: RouteRole::Partial,
                type_name: partial_type_name(&base, &meta.route_suffix),
            });
            targets.push(Some(id));
        }

        let lines = LineIndex::new(&page.source);
        let mut output = Output::new();
        emit_preamble(&mut output, page, options, &routes);

        for (route, target) in routes.iter().zip(targets) {
            output.blank();
            output.line(&format!(
                "func (*{}) Respond(w http.ResponseWriter, req *http.Request) error {{",
                route.type_name
            ));
            output.indent();
            Emitter::new(page, options, &lines, &mut output, target).emit_routine();
            output.line("return nil");
            output.dedent();
            output.line("}");
        }

        let (code, mappings) = output.finish();
        tracing::debug!(
            source = %options.source_path,
            targets = routes.len(),
            lines = code.lines().count(),
            "generated Go source"
        );

        GenerateResult {
            code,
            mappings,
            routes,
        }
    }
}

fn emit_preamble(output: &mut Output, page: &Page, options: &GenerateOptions, routes: &[RouteEntry]) {
    output.line(&format!(
        "// Code generated by upc from {}. DO NOT EDIT.",
        options.source_path
    ));
    output.blank();
    output.line(&format!("package {}", options.package_name));
    output.blank();

    output.line("import (");
    output.indent();
    output.line("\"net/http\"");
    let mut seen: Vec<(&str, &str)> = vec![("http", "net/http")];
    for decl in &page.imports {
        let key = (import_name(decl), decl.path.as_str());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        let path = go_string_literal(&decl.path);
        match &decl.pkg_alias {
            Some(alias) => output.line(&format!("{alias} {path}")),
            None => output.line(&path),
        }
    }
    output.dedent();
    output.line(")");

    output.blank();
    for route in routes {
        output.line(&format!("type {} struct{{}}", route.type_name));
    }

    output.blank();
    output.line("func init() {");
    output.indent();
    for route in routes {
        let role = match route.role {
            RouteRole::Page => "upRolePage",
            RouteRole::Partial => "upRolePartial",
        };
        output.line(&format!(
            "upRegister({}, new({}), {role})",
            go_string_literal(&route.pattern),
            route.type_name
        ));
    }
    output.dedent();
    output.line("}");
}

/// Name an import binds in the file: its alias, or the last path element.
fn import_name(decl: &ImportDecl) -> &str {
    match &decl.pkg_alias {
        Some(alias) => alias,
        None => decl.path.rsplit('/').next().unwrap_or(&decl.path),
    }
}

/// Whether markup is currently being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Outside the target partial: code runs, output is suppressed
    Start,
    InScope,
}

/// Body of one `Respond` method
struct Emitter<'p, 'o> {
    page: &'p Page,
    lines: &'p LineIndex,
    output: &'o mut Output,
    directive_file: Option<&'p str>,
    /// Span of the partial being rendered; `None` renders the whole page
    target: Option<Span>,
    scope: Scope,
}

impl<'p, 'o> Emitter<'p, 'o> {
    fn new(
        page: &'p Page,
        options: &'p GenerateOptions,
        lines: &'p LineIndex,
        output: &'o mut Output,
        target: Option<PartialId>,
    ) -> Self {
        let target = target.map(|id| page.partials.get(id).span);
        Self {
            page,
            lines,
            output,
            directive_file: options.line_directives.then_some(options.source_path.as_str()),
            target,
            scope: if target.is_some() { Scope::Start } else { Scope::InScope },
        }
    }

    fn emit_routine(&mut self) {
        let page = self.page;
        if let Some(handler) = &page.handler {
            self.mark(handler.span.start);
            self.output.push_verbatim(&handler.code);
        }
        self.emit_nodes(&page.nodes);
    }

    fn writing(&self) -> bool {
        self.scope == Scope::InScope
    }

    fn mark(&mut self, offset: usize) {
        let line = self.lines.line_of(offset);
        self.output.mark(self.directive_file, line);
    }

    fn emit_nodes(&mut self, nodes: &'p [Node]) {
        for node in nodes {
            self.emit_node(node);
        }
    }

    fn emit_node(&mut self, node: &'p Node) {
        match node {
            Node::Literal(lit) => self.emit_literal(&lit.text, lit.span.start),
            Node::StrExpr(expr) => self.emit_expr(expr),
            Node::Code(code) => {
                self.mark(code.span.start);
                self.output.push_verbatim(&code.code);
            }
            Node::Import(_) => {}
            Node::If(if_node) => self.emit_if(if_node),
            Node::For(for_node) => {
                self.mark(for_node.clause.span.start);
                let clause = for_node.clause.code.trim();
                if clause.is_empty() {
                    self.output.line("for {");
                } else {
                    self.output.line(&format!("for {clause} {{"));
                }
                self.emit_block(&for_node.block);
                self.output.line("}");
            }
            Node::Partial(partial) => {
                let entering = self.target == Some(partial.span);
                if entering {
                    self.scope = Scope::InScope;
                }
                self.emit_nodes(&partial.block.nodes);
                if entering {
                    self.scope = Scope::Start;
                }
            }
            Node::Block(block) => self.emit_nodes(&block.nodes),
            Node::Element(el) => self.emit_element(el),
        }
    }

    fn emit_literal(&mut self, text: &str, offset: usize) {
        if !self.writing() || text.is_empty() {
            return;
        }
        self.mark(offset);
        self.output
            .line(&format!("upWriteLiteral(w, {})", go_string_literal(text)));
    }

    fn emit_expr(&mut self, expr: &StrExprNode) {
        self.mark(expr.span.start);
        if self.writing() {
            self.output.line(&format!("upPrintEscaped(w, {})", expr.expr));
        } else {
            // Referenced, never evaluated
            self.output.line(&format!("if false {{ _ = ({}) }}", expr.expr));
        }
    }

    fn emit_if(&mut self, node: &'p IfNode) {
        self.mark(node.cond.span.start);
        self.output.line(&format!("if {} {{", node.cond.expr));
        self.emit_block(&node.then);

        let mut alt = node.alt.as_deref();
        while let Some(next) = alt {
            match next {
                Node::If(elif) => {
                    self.mark(elif.cond.span.start);
                    self.output.line(&format!("}} else if {} {{", elif.cond.expr));
                    self.emit_block(&elif.then);
                    alt = elif.alt.as_deref();
                }
                other => {
                    self.output.line("} else {");
                    self.output.indent();
                    self.emit_node(other);
                    self.output.dedent();
                    alt = None;
                }
            }
        }
        self.output.line("}");
    }

    fn emit_block(&mut self, block: &'p BlockNode) {
        self.output.indent();
        self.emit_nodes(&block.nodes);
        self.output.dedent();
    }

    fn emit_element(&mut self, el: &'p ElementNode) {
        let text = is_text_element(&el.tag.name);
        if !text {
            self.emit_nodes(&el.start_tag_nodes);
        }
        self.emit_nodes(&el.children);
        if !text && !el.self_closing {
            let end_tag = format!("</{}>", el.tag.name);
            self.emit_literal(&end_tag, el.span.end.saturating_sub(end_tag.len()));
        }
    }
}

fn strip_template_ext(path: &str) -> &str {
    path.strip_suffix(".up").unwrap_or(path)
}

/// Go identifier fragment for `text`. ASCII letters and digits are kept,
/// `/` becomes `__` and every other byte `_xHH`, so distinct paths never
/// produce the same name.
pub fn mangle(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(byte as char),
            b'/' | b'\\' => out.push_str("__"),
            _ => out.push_str(&format!("_x{byte:02X}")),
        }
    }
    out
}

/// `_P` never occurs inside a mangled name, so it cleanly separates the
/// page part from the partial chain.
fn partial_type_name(page: &str, suffix: &str) -> String {
    format!("UpPartial_{page}_P{}", mangle(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, UpParser};
    use crate::transform::coalesce_literals;

    fn generate_with(source: &str, options: &GenerateOptions) -> GenerateResult {
        let mut ast = UpParser::new().parse(source).unwrap();
        coalesce_literals(&mut ast);
        let page = Page::from_ast(ast).unwrap();
        GoGenerator::new().generate(&page, options)
    }

    fn generate(source: &str) -> GenerateResult {
        generate_with(source, &GenerateOptions::default())
    }

    /// Body of the `Respond` method of `type_name`
    fn routine<'a>(code: &'a str, type_name: &str) -> &'a str {
        let header = format!("func (*{type_name}) Respond(");
        let start = code.find(&header).unwrap_or_else(|| panic!("no routine for {type_name}"));
        let rest = &code[start..];
        &rest[..rest.find("\n}\n").unwrap()]
    }

    #[test]
    fn test_mangle() {
        assert_eq!(mangle("about"), "about");
        assert_eq!(mangle("users/$id"), "users___x24id");
        assert_eq!(mangle("a_b"), "a_x5Fb");
        assert_ne!(mangle("a/b"), mangle("a__b"));
    }

    #[test]
    fn test_file_layout() {
        let result = generate("^import \"strings\"\n^import \"strings\"\n<p>^strings.ToUpper(\"x\")</p>");
        let code = &result.code;
        assert!(code.starts_with("// Code generated by upc from index.up. DO NOT EDIT.\n\npackage build\n"));
        assert!(code.contains("import (\n\t\"net/http\"\n\t\"strings\"\n)\n"));
        assert_eq!(code.matches("\"strings\"").count(), 1);
        assert!(code.contains("type UpPage_index struct{}"));
        assert!(code.contains("\tupRegister(\"/\", new(UpPage_index), upRolePage)\n"));
        assert!(code.contains("func (*UpPage_index) Respond(w http.ResponseWriter, req *http.Request) error {"));
        assert!(code.contains("\tupPrintEscaped(w, strings.ToUpper(\"x\"))\n"));
        assert!(code.ends_with("\treturn nil\n}\n"));
    }

    #[test]
    fn test_import_aliases() {
        let result = generate("^import str \"strconv\"\n^import . \"fmt\"\n<p></p>");
        assert!(result.code.contains("\tstr \"strconv\"\n\t. \"fmt\"\n"));
    }

    #[test]
    fn test_handler_runs_first() {
        let source = "<p>^name</p>\n^handler {\n\tname := \"x\"\n}\n";
        let result = generate(source);
        let body = routine(&result.code, "UpPage_index");
        let handler_at = body.find("name := \"x\"").unwrap();
        let output_at = body.find("upWriteLiteral").unwrap();
        assert!(handler_at < output_at);
    }

    #[test]
    fn test_control_flow() {
        let source = "^if n > 1 { <b>many</b> } else if n == 1 { <i>one</i> } else { <text>none</text> }\n^for _, x := range xs { <li>^x</li> }";
        let result = generate_with(
            source,
            &GenerateOptions {
                line_directives: false,
                ..GenerateOptions::default()
            },
        );
        let body = routine(&result.code, "UpPage_index");
        assert!(body.contains(
            "\tif n > 1 {\n\t\tupWriteLiteral(w, \"<b>\")\n\t\tupWriteLiteral(w, \"many\")\n\t\tupWriteLiteral(w, \"</b>\")\n"
        ));
        assert!(body.contains("\t} else if n == 1 {\n"));
        assert!(body.contains("\t} else {\n\t\tupWriteLiteral(w, \"none\")\n\t}\n"));
        assert!(body.contains("\tfor _, x := range xs {\n"));
        assert!(body.contains("\t\tupPrintEscaped(w, x)\n"));
        assert!(!body.contains("<text>"));
        assert!(!body.contains("//line"));
    }

    #[test]
    fn test_void_and_self_closing_have_no_end_tag() {
        let result = generate("<br><x-icon/><p>a</p>");
        assert!(!result.code.contains("</br>"));
        assert!(!result.code.contains("</x-icon>"));
        assert!(result.code.contains("upWriteLiteral(w, \"</p>\")"));
    }

    #[test]
    fn test_escapes_literal_text() {
        let result = generate("<p title=\"a\\b\">line\n\"two\"</p>");
        assert!(result.code.contains(r#"upWriteLiteral(w, "<p title=\"a\\b\">")"#));
        assert!(result.code.contains(r#"upWriteLiteral(w, "line\n\"two\"")"#));
    }

    #[test]
    fn test_line_directives_and_mappings() {
        let source = "<div>\n  <p>^x</p>\n</div>";
        let result = generate(source);
        assert!(result.code.contains("\n//line index.up:1\n\tupWriteLiteral(w, \"<div>\")\n"));
        assert!(result.code.contains("\n//line index.up:2\n\tupPrintEscaped(w, x)\n"));

        let lines: Vec<&str> = result.code.lines().collect();
        for mapping in &result.mappings {
            let previous = lines[mapping.gen_line - 2];
            assert_eq!(previous, format!("//line index.up:{}", mapping.src_line));
        }
        assert!(result.mappings.iter().any(|m| m.src_line == 2));
    }

    #[test]
    fn test_else_if_condition_is_marked() {
        let source = "^if a {\n<b>x</b>\n} else if b {\n<i>y</i>\n}";
        let result = generate(source);
        assert!(result.code.contains("\n//line index.up:1\n\tif a {\n"));
        assert!(result.code.contains("\n//line index.up:3\n\t} else if b {\n"));
    }

    #[test]
    fn test_import_matching_runtime_import_is_not_repeated() {
        let result = generate("^import http \"net/http\"\n^import \"net/http\"\n<p>x</p>");
        let preamble = result.code.split("\n)\n").next().unwrap();
        assert_eq!(preamble.matches("\"net/http\"").count(), 1);

        let result = generate("^import h \"net/http\"\n<p>x</p>");
        assert!(result.code.contains("\th \"net/http\"\n"));
    }

    #[test]
    fn test_partial_routine_runs_setup_and_suppresses_page_markup() {
        let source = "^{ items := load() }\n<div>\n  <h1>^title</h1>\n  ^partial list { <ul>^for _, it := range items { <li>^it</li> }</ul> }\n</div>";
        let result = generate(source);

        assert_eq!(
            result.routes,
            [
                RouteEntry {
                    pattern: "/".into(),
                    role: RouteRole::Page,
                    type_name: "UpPage_index".into(),
                },
                RouteEntry {
                    pattern: "/list".into(),
                    role: RouteRole::Partial,
                    type_name: "UpPartial_index_Plist".into(),
                },
            ]
        );

        let page = routine(&result.code, "UpPage_index");
        assert!(page.contains("<h1>"));
        assert!(page.contains("upPrintEscaped(w, title)"));
        assert!(page.contains("\"<ul>\""));

        let partial = routine(&result.code, "UpPartial_index_Plist");
        assert!(partial.contains(" items := load() "));
        assert!(!partial.contains("<div>"));
        assert!(!partial.contains("<h1>"));
        assert!(partial.contains("if false { _ = (title) }"));
        assert!(partial.contains("upWriteLiteral(w, \"<ul>\")"));
        assert!(partial.contains("upPrintEscaped(w, it)"));
        assert!(partial.contains("upWriteLiteral(w, \"</ul>\")"));
    }

    #[test]
    fn test_nested_partials_get_qualified_routes() {
        let options = GenerateOptions {
            source_path: "users/$id.up".into(),
            ..GenerateOptions::default()
        };
        let source = "^partial outer { <div>^partial inner { <p>in</p> }</div> }";
        let result = generate_with(source, &options);
        let patterns: Vec<&str> = result.routes.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, ["/users/:id", "/users/:id/outer", "/users/:id/outer/inner"]);
        assert_eq!(result.routes[2].type_name, "UpPartial_users___x24id_Pouter__inner");

        // The inner partial renders inside the outer one
        let outer = routine(&result.code, "UpPartial_users___x24id_Pouter");
        assert!(outer.contains("upWriteLiteral(w, \"in\")"));
        let inner = routine(&result.code, "UpPartial_users___x24id_Pouter__inner");
        assert!(!inner.contains("<div>"));
        assert!(inner.contains("upWriteLiteral(w, \"in\")"));
    }
}
