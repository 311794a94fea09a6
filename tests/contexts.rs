//! Navigation over in-memory documents

use livexml::{
    parse_str, parse_str_with, Context, ElementContext, Indent, Options, QueryError, XmlContext,
};
use rstest::{fixture, rstest};

const VEHICLES: &str = r#"<driverVehicleInfo>
    <vehicle id="RR1">
        <name>Limousine</name>
    </vehicle>
    <vehicle id="AM1"/>
    <vehicle id="B1"/>
</driverVehicleInfo>"#;

const BOOKS: &str = r#"<?xml version="1.0"?>
<b:books xmlns:b="urn:books:qualified">
    <b:book id="bk001">
        <b:author>Writer</b:author>
        <b:title>The First Title</b:title>
        <b:genre>Fiction</b:genre>
    </b:book>
    <b:book id="bk002">
        <b:author>Poet</b:author>
        <b:title>The Poet's First Poem</b:title>
        <b:genre>Poem</b:genre>
    </b:book>
</b:books>"#;

#[fixture]
fn vehicles() -> ElementContext {
    parse_str(VEHICLES).unwrap()
}

#[fixture]
fn books() -> ElementContext {
    parse_str(BOOKS).unwrap()
}

fn value(ctx: Option<Context>) -> String {
    ctx.and_then(|c| c.value().map(str::to_string))
        .expect("expected a value context")
}

fn collapse_layout(text: &str) -> String {
    text.lines().map(str::trim).collect()
}

#[rstest]
fn select_all_in_document_order(vehicles: ElementContext) {
    let found = vehicles.select_all("/driverVehicleInfo/vehicle").unwrap();
    let ids: Vec<String> = found
        .iter()
        .map(|ctx| value(ctx.select("@id").unwrap()))
        .collect();
    assert_eq!(ids, ["RR1", "AM1", "B1"]);
    assert!(found.iter().all(|ctx| !ctx.is_value()));
}

#[rstest]
fn attribute_select_is_terminal(vehicles: ElementContext) {
    let id = vehicles
        .select("/driverVehicleInfo/vehicle[@id='RR1']/@id")
        .unwrap()
        .unwrap();
    assert_eq!(id.value(), Some("RR1"));
    assert_eq!(
        id.select("/anything").unwrap_err(),
        QueryError::UnsupportedOperation { operation: "select" }
    );
}

#[rstest]
fn select_rejects_multiple_matches() {
    let ctx = parse_str("<a><b/><b/></a>").unwrap();
    match ctx.select("/a/b") {
        Err(QueryError::AmbiguousSelect { count, xpath }) => {
            assert_eq!(count, 2);
            assert_eq!(xpath, "/a/b");
        }
        other => panic!("expected an ambiguous select, got {other:?}"),
    }
}

#[rstest]
#[case("/driverVehicleInfo/truck")]
#[case("vehicle[@id='none']")]
#[case("vehicle/@missing")]
fn no_match_is_empty(vehicles: ElementContext, #[case] xpath: &str) {
    assert!(vehicles.select(xpath).unwrap().is_none());
    assert!(vehicles.select_all(xpath).unwrap().is_empty());
}

#[rstest]
#[case("count(/driverVehicleInfo/vehicle)", "3")]
#[case("string(vehicle[1]/name)", "Limousine")]
#[case("concat(vehicle[2]/@id, '-', vehicle[3]/@id)", "AM1-B1")]
#[case("boolean(vehicle/name)", "true")]
fn scalar_results_fall_back_to_values(
    vehicles: ElementContext,
    #[case] xpath: &str,
    #[case] expected: &str,
) {
    assert_eq!(value(vehicles.select(xpath).unwrap()), expected);
}

#[rstest]
#[case("@id='RR1'")]
#[case("vehicle/@id = 'RR1' or true()")]
#[case("1 + 2")]
fn binary_expressions_are_unsupported(vehicles: ElementContext, #[case] xpath: &str) {
    assert!(matches!(
        vehicles.select_all(xpath),
        Err(QueryError::UnsupportedExpression { .. })
    ));
}

#[rstest]
#[case("/driverVehicleInfo/vehicle[")]
#[case("vehicle[@id=]")]
#[case("unknown:vehicle")]
#[case("frobnicate()")]
fn invalid_queries(vehicles: ElementContext, #[case] xpath: &str) {
    assert!(matches!(
        vehicles.select_all(xpath),
        Err(QueryError::InvalidSyntax { .. })
    ));
}

#[rstest]
fn canonical_text(vehicles: ElementContext) {
    assert_eq!(
        vehicles.as_text(),
        r#"<driverVehicleInfo><vehicle id="RR1"><name>Limousine</name></vehicle><vehicle id="AM1"></vehicle><vehicle id="B1"></vehicle></driverVehicleInfo>"#
    );
    let first = vehicles.select("vehicle[1]").unwrap().unwrap();
    assert_eq!(first.as_element().map(ElementContext::name), Some("vehicle"));
    assert_eq!(first.as_text(), r#"<vehicle id="RR1"><name>Limousine</name></vehicle>"#);
    assert_eq!(first.as_text(), first.to_text(false));
}

#[rstest]
fn formatted_text_with_tabs() {
    let ctx = parse_str_with(BOOKS, Options::new().indent(Indent::Tab)).unwrap();
    let book = ctx.select("b:book[@id='bk001']").unwrap().unwrap();
    assert_eq!(
        book.to_text(true),
        "<b:book id=\"bk001\">\n\t<b:author>Writer</b:author>\n\t<b:title>The First Title</b:title>\n\t<b:genre>Fiction</b:genre>\n</b:book>"
    );
}

#[rstest]
fn formatted_text_with_spaces(vehicles: ElementContext) {
    assert_eq!(
        vehicles.to_text(true),
        "<driverVehicleInfo>\n    <vehicle id=\"RR1\">\n        <name>Limousine</name>\n    </vehicle>\n    <vehicle id=\"AM1\"></vehicle>\n    <vehicle id=\"B1\"></vehicle>\n</driverVehicleInfo>"
    );
}

#[rstest]
#[case(VEHICLES)]
#[case(BOOKS)]
#[case("<a><b>x <i>y</i> z</b><!--c--><c><d/><?pi data?></c></a>")]
fn formatting_preserves_content(#[case] xml: &str) {
    let ctx = parse_str(xml).unwrap();
    let formatted = ctx.to_text(true);
    assert_eq!(collapse_layout(&formatted), ctx.as_text());
    assert_eq!(ctx.to_text(true), formatted);
}

#[rstest]
fn canonical_text_reparses_to_same_text(books: ElementContext) {
    let again = parse_str(&books.as_text()).unwrap();
    assert_eq!(again.as_text(), books.as_text());
}

#[rstest]
fn qualified_queries(books: ElementContext) {
    assert!(books.select("/b:books/b:book[@id='bk001']").unwrap().is_some());
    assert_eq!(books.select_all("/b:books/b:book").unwrap().len(), 2);
    assert!(books.select("/b:books/book[@id='bk001']").unwrap().is_none());

    let book = books.select("/b:books/b:book[@id='bk002']").unwrap().unwrap();
    assert_eq!(value(book.select("b:genre/text()").unwrap()), "Poem");
    assert_eq!(value(book.select("@id").unwrap()), "bk002");
}

#[rstest]
fn registered_prefix_with_other_name(mut books: ElementContext) {
    books.register_namespace("lib", "urn:books:qualified");
    assert_eq!(books.select_all("/lib:books/lib:book").unwrap().len(), 2);
    assert_eq!(books.select_all("//lib:title").unwrap().len(), 2);
}

#[rstest]
fn default_namespace_needs_a_prefix() {
    let mut ctx = parse_str(r#"<books xmlns="urn:books:unqualified"><book id="1"/></books>"#).unwrap();
    assert!(ctx.select("/books/book").unwrap().is_none());
    ctx.register_namespace("u", "urn:books:unqualified");
    assert!(ctx.select("/u:books/u:book").unwrap().is_some());
}

#[rstest]
fn namespaces_do_not_leak_between_contexts(books: ElementContext) {
    let mut first = books.select("b:book[1]").unwrap().unwrap();
    let second = books.select("b:book[2]").unwrap().unwrap();
    first.register_namespace("x", "urn:books:qualified").unwrap();

    assert!(first.select("x:title").unwrap().is_some());
    for other in [&Context::Element(books.clone()), &second] {
        assert!(matches!(
            other.select_all("//x:title"),
            Err(QueryError::InvalidSyntax { .. })
        ));
    }

    let derived = first.select("x:title").unwrap().unwrap();
    assert!(derived.select("/x:books").unwrap().is_some());
}

#[rstest]
fn absolute_query_from_derived_context(vehicles: ElementContext) {
    let name = vehicles.select("vehicle/name").unwrap().unwrap();
    assert_eq!(name.select_all("/driverVehicleInfo/vehicle").unwrap().len(), 3);
    assert_eq!(value(name.select("../@id").unwrap()), "RR1");
}

#[rstest]
fn parent_of_root_is_root(vehicles: ElementContext) {
    let parent = vehicles.select("..").unwrap().unwrap();
    assert_eq!(parent.as_element().map(ElementContext::name), Some("driverVehicleInfo"));
    assert_eq!(parent.as_text(), vehicles.as_text());
    assert_eq!(parent.select_all("vehicle").unwrap().len(), 3);
}

#[rstest]
fn text_and_cdata_are_values() {
    let ctx = parse_str("<a>one &amp; two<![CDATA[<three>]]><!--four--></a>").unwrap();
    let texts: Vec<String> = ctx
        .select_all("text()")
        .unwrap()
        .into_iter()
        .map(|c| match c {
            Context::Value(text) => text.into_string(),
            Context::Element(elem) => panic!("unexpected element {elem}"),
        })
        .collect();
    assert_eq!(texts, ["one & two", "<three>"]);
    assert_eq!(value(ctx.select("comment()").unwrap()), "four");
}

#[rstest]
fn contexts_are_shareable_across_threads(vehicles: ElementContext) {
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| vehicles.select_all("vehicle").unwrap().len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 3);
        }
    });
}

#[rstest]
fn batched_queries(books: ElementContext) {
    let results = books
        .xmap(&[("titles", "//b:title"), ("first", "b:book[1]/@id"), ("none", "//missing")])
        .unwrap();
    let sizes: Vec<_> = results.iter().map(|(key, found)| (*key, found.len())).collect();
    assert_eq!(sizes, [("titles", 2), ("first", 1), ("none", 0)]);
}
