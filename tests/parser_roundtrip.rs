//! Parser properties: printing round-trips, spans nest, serialization shape

use fhirpath::ast::{ExpressionNode, print_expression};
use fhirpath::parser::parse;
use rstest::rstest;

#[rstest]
#[case("Patient.name.given.first()")]
#[case("name.where(use = 'official').given")]
#[case("a and b or c xor d implies e")]
#[case("a.b[0].c[i + 1]")]
#[case("value.ofType(Quantity).value > 100")]
#[case("Observation.value as Quantity")]
#[case("value is System.Boolean")]
#[case("(1 + 2) * 3 - -4")]
#[case("birthDate + 3 months < today()")]
#[case("5.4 'mg' + 2 'mg'")]
#[case("%resource.entry.count() = 7")]
#[case("$this.length() > $index")]
#[case("items.select(iif($this > 0, 'pos', 'neg'))")]
#[case("text.`div`.trim()")]
#[case("telecom.exists(system = 'phone') implies telecom.count() > 1")]
#[case("{}")]
#[case("'quoted'.substring(0, 3) = 'quo'")]
fn print_parse_round_trip(#[case] source: &str) {
    let ast = parse(source).unwrap_or_else(|e| panic!("parse '{source}': {e}"));
    let printed = print_expression(&ast);
    let reparsed =
        parse(&printed).unwrap_or_else(|e| panic!("reparse '{printed}' (from '{source}'): {e}"));
    assert!(
        reparsed.structurally_eq(&ast),
        "round trip changed '{source}' -> '{printed}'"
    );
    // Printing is a fixed point after one normalization
    let reprinted = print_expression(&reparsed);
    assert_eq!(printed, reprinted);
}

#[rstest]
#[case("Patient.name.given.first()")]
#[case("a + b * c - d")]
#[case("items[2].value.where(x > 1)")]
fn root_span_covers_the_whole_source(#[case] source: &str) {
    let ast = parse(source).unwrap();
    assert_eq!(ast.span().start, 0);
    assert_eq!(ast.span().end, source.len());
}

#[test]
fn child_spans_are_subranges_of_their_parents() {
    fn check(node: &ExpressionNode) {
        let parent = node.span();
        let mut assert_child = |child: &ExpressionNode| {
            assert!(
                parent.contains(child.span()),
                "child {:?} outside parent {:?}",
                child.span(),
                parent
            );
            check(child);
        };
        match node {
            ExpressionNode::BinaryOp { left, right, .. } => {
                assert_child(left);
                assert_child(right);
            }
            ExpressionNode::UnaryOp { operand, .. } => assert_child(operand),
            ExpressionNode::FunctionCall { args, .. } => args.iter().for_each(assert_child),
            ExpressionNode::Index { base, index, .. } => {
                assert_child(base);
                assert_child(index);
            }
            ExpressionNode::Path { base, member, .. } => {
                assert_child(base);
                assert_child(member);
            }
            ExpressionNode::TypeCheck { expression, .. }
            | ExpressionNode::TypeCast { expression, .. } => assert_child(expression),
            _ => {}
        }
    }

    for source in [
        "Patient.name.where(use = 'official').given.first()",
        "(a.b + c[0]) * -d implies e | f",
        "value.as(Quantity).value > 2.5 'mg'",
    ] {
        check(&parse(source).unwrap());
    }
}

#[test]
fn ast_serializes_with_kind_span_and_surface_operators() {
    let ast = parse("a.b | c").unwrap();
    let v = ast.to_json();
    assert_eq!(v["kind"], "binary");
    assert_eq!(v["op"], "|");
    assert_eq!(v["span"]["start"], 0);
    assert_eq!(v["span"]["end"], 7);
    assert_eq!(v["left"]["kind"], "dot");
    assert_eq!(v["left"]["right"]["name"], "b");
    assert_eq!(v["right"]["kind"], "identifier");
}

#[test]
fn quantity_and_temporal_literals_keep_their_text() {
    let ast = parse("3 days").unwrap();
    assert_eq!(print_expression(&ast), "3 days");
    let ast = parse("@2020-03-14T13:45Z").unwrap();
    assert_eq!(print_expression(&ast), "@2020-03-14T13:45Z");
    let ast = parse("4.50 'mg'").unwrap();
    assert_eq!(print_expression(&ast), "4.50 'mg'");
}
