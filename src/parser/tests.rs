use pretty_assertions::assert_eq;

use super::*;
use crate::ast::*;
use crate::error::ErrorKind;
use attrs::LexErrorKind;

fn parse(source: &str) -> Vec<Node> {
    UpParser::new()
        .parse(source)
        .unwrap_or_else(|err| panic!("parse failed: {err}"))
        .nodes
}

fn parse_err(source: &str) -> ParseError {
    match UpParser::new().parse(source) {
        Ok(ast) => panic!("expected an error, got {:#?}", ast.nodes),
        Err(err) => err,
    }
}

fn lit(text: &str, start: usize, end: usize) -> Node {
    Node::Literal(LiteralNode {
        text: text.to_string(),
        span: Span::new(start, end),
    })
}

fn expr(text: &str, start: usize, end: usize) -> Node {
    Node::StrExpr(StrExprNode {
        expr: text.to_string(),
        span: Span::new(start, end),
    })
}

fn element(node: &Node) -> &ElementNode {
    match node {
        Node::Element(el) => el,
        other => panic!("expected element, got {other:?}"),
    }
}

fn only_child(block: &BlockNode) -> &Node {
    assert_eq!(block.nodes.len(), 1, "blocks hold exactly one node");
    &block.nodes[0]
}

#[test]
fn test_plain_element() {
    let nodes = parse("<p>Hello</p>");
    assert_eq!(
        nodes,
        [Node::Element(ElementNode {
            tag: Tag {
                name: "p".into(),
                attrs: vec![],
            },
            start_tag_nodes: vec![lit("<p>", 0, 3)],
            children: vec![lit("Hello", 3, 8)],
            self_closing: false,
            span: Span::new(0, 12),
        })]
    );
}

#[test]
fn test_escaped_marker() {
    assert_eq!(
        parse("a ^^ b"),
        [lit("a ", 0, 2), lit("^", 2, 4), lit(" b", 4, 6)]
    );
}

#[test]
fn test_implicit_expression_stops_at_trailing_period() {
    let nodes = parse("<p>^user.Name.</p>");
    let p = element(&nodes[0]);
    assert_eq!(p.children, [expr("user.Name", 4, 13), lit(".", 13, 14)]);
}

#[test]
fn test_implicit_expression_with_calls_and_indexes() {
    assert_eq!(
        parse("^items[0].Title(x) rest"),
        [expr("items[0].Title(x)", 1, 18), lit(" rest", 18, 23)]
    );
}

#[test]
fn test_implicit_expression_stops_at_whitespace() {
    assert_eq!(parse("^a .b"), [expr("a", 1, 2), lit(" .b", 2, 5)]);
}

#[test]
fn test_explicit_expression() {
    assert_eq!(parse("^(a + b)!"), [expr("a + b", 2, 7), lit("!", 8, 9)]);
}

#[test]
fn test_if_else() {
    let nodes = parse("^if x > 1 {<b>big</b>} else {<i>small</i>}");
    assert_eq!(nodes.len(), 1);
    let Node::If(node) = &nodes[0] else {
        panic!("expected if");
    };
    assert_eq!(node.cond.expr, "x > 1");
    assert_eq!(node.cond.span, Span::new(4, 9));
    assert_eq!(element(only_child(&node.then)).tag.name, "b");
    match node.alt.as_deref() {
        Some(Node::Block(block)) => assert_eq!(element(only_child(block)).tag.name, "i"),
        other => panic!("expected else block, got {other:?}"),
    }
}

#[test]
fn test_else_if_chain() {
    let nodes = parse("^if a { <p>1</p> } else if b { <p>2</p> } else { <p>3</p> }");
    let Node::If(first) = &nodes[0] else {
        panic!("expected if");
    };
    let Some(Node::If(second)) = first.alt.as_deref() else {
        panic!("expected else-if");
    };
    assert_eq!(second.cond.expr, "b");
    assert!(matches!(second.alt.as_deref(), Some(Node::Block(_))));
}

#[test]
fn test_else_on_next_line_is_text() {
    let source = "^if a { <p>x</p> }\nelse we wait";
    let nodes = parse(source);
    assert_eq!(nodes.len(), 2);
    let Node::If(node) = &nodes[0] else {
        panic!("expected if");
    };
    assert!(node.alt.is_none());
    assert_eq!(nodes[1], lit("\nelse we wait", 18, source.len()));
}

#[test]
fn test_markup_resumes_after_block() {
    let nodes = parse("^if a { <p>x</p> } tail");
    assert_eq!(nodes.len(), 2);
    assert!(matches!(nodes[0], Node::If(_)));
    assert_eq!(nodes[1], lit(" tail", 18, 23));
}

#[test]
fn test_for_loop() {
    let source = "^for _, v := range vs { <li>^v</li> }";
    let nodes = parse(source);
    let Node::For(node) = &nodes[0] else {
        panic!("expected for");
    };
    assert_eq!(node.clause.code, "_, v := range vs");
    assert_eq!(node.clause.context, CodeContext::Inline);
    assert_eq!(&source[node.clause.span.start..node.clause.span.end], "_, v := range vs");
    let li = element(only_child(&node.block));
    let v_at = source.find("^v").unwrap() + 1;
    assert_eq!(li.children, [expr("v", v_at, v_at + 1)]);
}

#[test]
fn test_nested_construct_in_block() {
    let nodes = parse("^for _, row := range rows { ^if row.On { <b>on</b> } }");
    let Node::For(node) = &nodes[0] else {
        panic!("expected for");
    };
    let Node::If(inner) = only_child(&node.block) else {
        panic!("expected nested if");
    };
    assert_eq!(inner.cond.expr, "row.On");
}

#[test]
fn test_handler_and_inline_code() {
    let source = "^handler {\n  x := 1\n}\n^{ x++ }<p>^x</p>";
    let nodes = parse(source);
    assert_eq!(
        nodes[0],
        Node::Code(CodeNode {
            context: CodeContext::Handler,
            code: "\n  x := 1\n".into(),
            span: Span::new(10, 20),
        })
    );
    assert_eq!(nodes[1], lit("\n", 21, 22));
    let Node::Code(inline) = &nodes[2] else {
        panic!("expected inline code");
    };
    assert_eq!(inline.context, CodeContext::Inline);
    assert_eq!(inline.code, " x++ ");
    assert!(matches!(nodes[3], Node::Element(_)));
}

#[test]
fn test_handler_name_as_expression() {
    assert_eq!(parse("^handler.Name"), [expr("handler.Name", 1, 13)]);
}

#[test]
fn test_imports() {
    let nodes = parse("^import \"strings\"\n^import str \"strconv\"\n^import . \"fmt\"\n");
    let decls: Vec<&ImportDecl> = nodes
        .iter()
        .filter_map(|n| match n {
            Node::Import(import) => Some(&import.decl),
            _ => None,
        })
        .collect();
    assert_eq!(
        decls,
        [
            &ImportDecl {
                pkg_alias: None,
                path: "strings".into()
            },
            &ImportDecl {
                pkg_alias: Some("str".into()),
                path: "strconv".into()
            },
            &ImportDecl {
                pkg_alias: Some(".".into()),
                path: "fmt".into()
            },
        ]
    );
    assert_eq!(nodes[0].span(), Span::new(0, 17));
}

#[test]
fn test_partial() {
    let source = "<div>^partial list { <ul></ul> }</div>";
    let nodes = parse(source);
    let div = element(&nodes[0]);
    let Node::Partial(partial) = &div.children[0] else {
        panic!("expected partial");
    };
    assert_eq!(partial.name, "list");
    assert_eq!(partial.span, Span::new(5, source.len() - "</div>".len()));
    assert_eq!(element(only_child(&partial.block)).tag.name, "ul");
}

#[test]
fn test_text_pseudo_element_groups_siblings() {
    let nodes = parse("^if a { <text>one <b>two</b></text> }");
    let Node::If(node) = &nodes[0] else {
        panic!("expected if");
    };
    let text = element(only_child(&node.then));
    assert_eq!(text.tag.name, "text");
    assert_eq!(text.children.len(), 2);
}

#[test]
fn test_attribute_expressions_split_start_tag() {
    let source = r#"<a href="/u/^id" class=^cls>x</a>"#;
    let nodes = parse(source);
    let a = element(&nodes[0]);
    let id_at = source.find("id\"").unwrap();
    let cls_at = source.find("cls").unwrap();
    assert_eq!(
        a.start_tag_nodes,
        [
            lit("<a href=\"", 0, 9),
            lit("/u/", 9, id_at - 1),
            expr("id", id_at, id_at + 2),
            lit("\" class=", id_at + 2, cls_at - 1),
            expr("cls", cls_at, cls_at + 3),
            lit(">", cls_at + 3, cls_at + 4),
        ]
    );
    // Attribute offsets are absolute
    assert_eq!(a.tag.attrs[0].value.start, source.find("/u/").unwrap());
    assert_eq!(a.tag.attrs[1].name.text, "class");
}

#[test]
fn test_marker_in_attribute_name() {
    let source = r#"<p data-^name="v"></p>"#;
    let nodes = parse(source);
    let p = element(&nodes[0]);
    assert_eq!(
        p.start_tag_nodes,
        [
            lit("<p ", 0, 3),
            lit("data-", 3, 8),
            expr("name", 9, 13),
            lit("=\"v\">", 13, 18),
        ]
    );
}

#[test]
fn test_escaped_marker_in_attribute() {
    let nodes = parse(r#"<p title="a^^b"></p>"#);
    let p = element(&nodes[0]);
    assert_eq!(
        p.start_tag_nodes,
        [
            lit("<p title=\"", 0, 10),
            lit("a", 10, 11),
            lit("^", 11, 13),
            lit("b", 13, 14),
            lit("\">", 14, 16),
        ]
    );
}

#[test]
fn test_void_and_self_closing_elements() {
    let nodes = parse("<br><img src=\"^u\"/><x-icon/>");
    assert_eq!(nodes.len(), 3);
    for node in &nodes {
        let el = element(node);
        assert!(el.self_closing);
        assert!(el.children.is_empty());
    }
}

#[test]
fn test_raw_text_element() {
    let nodes = parse("<script>if (a < b && c) { go() }</script>");
    let script = element(&nodes[0]);
    assert_eq!(script.children.len(), 1);
    let Node::Literal(body) = &script.children[0] else {
        panic!("expected literal");
    };
    assert_eq!(body.text, "if (a < b && c) { go() }");
}

#[test]
fn test_comments_and_doctype_are_literals() {
    let source = "<!DOCTYPE html><!-- ^not code -->";
    assert_eq!(parse(source), [lit("<!DOCTYPE html>", 0, 15), lit("<!-- ^not code -->", 15, 33)]);
}

#[test]
fn test_stray_end_tag_at_top_level() {
    assert_eq!(parse("a</div>b"), [lit("a", 0, 1), lit("</div>", 1, 7), lit("b", 7, 8)]);
}

#[test]
fn test_less_than_in_text() {
    assert_eq!(parse("1 < 2"), [lit("1 < 2", 0, 5)]);
}

#[test]
fn test_attribute_diagnostics_are_recorded() {
    let ast = UpParser::new().parse("<hr>\n<p a=1 a=2></p>").unwrap();
    assert_eq!(ast.diagnostics.len(), 1);
    assert_eq!(ast.diagnostics[0].kind, LexErrorKind::DuplicateAttribute);
    assert_eq!(ast.diagnostics[0].offset, 12);
}

#[test]
fn test_error_sibling_elements_in_block() {
    let err = parse_err("^if a { <p></p><p></p> }");
    assert_eq!(err.kind, ErrorKind::InvalidBlock);
    assert_eq!((err.line, err.column), (1, 16));
    assert!(err.help.as_deref().unwrap_or("").contains("<text>"));
}

#[test]
fn test_error_text_in_block() {
    let err = parse_err("^if a { hello }");
    assert_eq!(err.kind, ErrorKind::InvalidBlock);
}

#[test]
fn test_error_empty_block() {
    let err = parse_err("^if a { }");
    assert_eq!(err.kind, ErrorKind::InvalidBlock);
    assert_eq!(err.message, "empty if block");
}

#[test]
fn test_error_invalid_condition() {
    let err = parse_err("^if x := 1 { <p></p> }");
    assert_eq!(err.kind, ErrorKind::InvalidExpression);
    assert_eq!(err.message, "'x := 1' is not a valid Go expression");
    assert_eq!(err.span, Span::new(4, 10));
}

#[test]
fn test_error_invalid_explicit_expression() {
    let err = parse_err("<p>^(a +)</p>");
    assert_eq!(err.kind, ErrorKind::InvalidExpression);
    assert_eq!((err.line, err.column), (1, 6));
}

#[test]
fn test_error_space_after_marker() {
    let err = parse_err("<p>^ x</p>");
    assert_eq!(err.kind, ErrorKind::UnexpectedToken);
    assert_eq!(err.span, Span::new(3, 4));
}

#[test]
fn test_error_marker_at_end_of_input() {
    assert_eq!(parse_err("abc^").kind, ErrorKind::UnexpectedEof);
}

#[test]
fn test_error_unclosed_element() {
    let err = parse_err("<div>\n  <p>hi</p>\n");
    assert_eq!(err.kind, ErrorKind::UnclosedElement);
    assert_eq!(err.span, Span::new(0, 5));
    assert_eq!(err.to_string(), "1:1: unclosed element <div>");
}

#[test]
fn test_error_mismatched_close_tag() {
    let err = parse_err("<div>\n</span>");
    assert_eq!(err.kind, ErrorKind::MismatchedCloseTag);
    assert_eq!((err.line, err.column), (2, 1));
    assert_eq!(err.related_span, Some(Span::new(0, 5)));
}

#[test]
fn test_error_unterminated_tag_and_comment() {
    assert_eq!(parse_err("<p class=\"x").kind, ErrorKind::UnterminatedTag);
    assert_eq!(parse_err("<!-- open").kind, ErrorKind::UnterminatedComment);
}

#[test]
fn test_error_code_in_attribute() {
    let err = parse_err(r#"<p title="^{ x }"></p>"#);
    assert_eq!(err.kind, ErrorKind::InvalidAttribute);
    assert_eq!(err.span, Span::new(10, 11));
}

#[test]
fn test_error_unclosed_code_block() {
    assert_eq!(parse_err("^{ x := 1").kind, ErrorKind::UnclosedBlock);
}

#[test]
fn test_error_bad_import() {
    assert_eq!(parse_err("^import strings").kind, ErrorKind::InvalidImport);
}

#[test]
fn test_error_missing_close_brace() {
    let err = parse_err("^if a { <p></p> x");
    assert_eq!(err.kind, ErrorKind::UnexpectedToken);
    assert_eq!(err.span, Span::new(16, 17));
}
