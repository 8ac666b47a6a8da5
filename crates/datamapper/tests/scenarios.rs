mod common;

use common::{Fixture, body_of, document};
use datamapper::{MapperConfig, NodeKind, to_text_edits};
use pretty_assertions::assert_eq;

#[test]
fn test_link_into_empty_record() {
    let fixture = Fixture::new(document("Summary", "{}"));
    let applied = fixture.link("person.name", "mappingConstructor.name");
    assert_eq!(body_of(&applied), "{name: person.name}");
}

#[test]
fn test_link_after_existing_field() {
    let fixture = Fixture::new(document("Summary", "{name: person.name}"));
    let applied = fixture.link("person.age", "mappingConstructor.age");
    assert_eq!(body_of(&applied), "{name: person.name,\n\tage: person.age}");
}

#[test]
fn test_delete_last_field() {
    let fixture = Fixture::new(document("Summary", "{name: person.name, age: person.age}"));
    let applied = fixture.delete_into("mappingConstructor.age");
    assert_eq!(body_of(&applied), "{name: person.name}");
}

#[test]
fn test_json_fields_are_merged() {
    let fixture = Fixture::new(document("Payload", "{id: \"1\", data: {a: 1}}"));
    let applied = fixture.link("person.extra", "mappingConstructor.data");
    assert!(applied.starts_with("import ballerina/lang.value;\n"));
    assert_eq!(
        body_of(&applied),
        "{id: \"1\", data: value:mergeJson({a: 1}, person.extra)}"
    );
}

#[test]
fn test_json_merge_as_text_edits() {
    let fixture = Fixture::new(document("Payload", "{id: \"1\", data: {a: 1}}"));
    let edits = datamapper::create_link(
        &fixture.tree,
        &fixture.graph,
        fixture.port("person.extra"),
        fixture.port("mappingConstructor.data"),
        &MapperConfig::default(),
    )
    .unwrap();
    let text_edits = to_text_edits(&fixture.source, &edits).unwrap();
    assert_eq!(text_edits.len(), 2);
    assert_eq!(text_edits[0].new_text, "value:mergeJson({a: 1}, person.extra)");
    assert_eq!(text_edits[1].new_text, "import ballerina/lang.value;\n");
    assert_eq!(text_edits[1].range.start, lsp_types::Position::new(0, 0));
}

#[test]
fn test_cast_selects_union_member() {
    let fixture = Fixture::new(document(
        "Pet",
        "<Dog>{name: person.name, breed: person.address.city}",
    ));
    let output = fixture.graph.node(fixture.graph.output_node().unwrap());
    assert_eq!(output.kind, NodeKind::UnionType { requires_cast: false });
    assert!(fixture.graph.find_port("unionType.indoor").is_none());
    assert_eq!(
        fixture.linked_source("unionType.breed").as_deref(),
        Some("person.address.city")
    );

    let fixture = Fixture::new(document("Pet", "<Dog>{name: person.name}"));
    let applied = fixture.link("person.address.city", "unionType.breed");
    assert_eq!(
        body_of(&applied),
        "<Dog>{name: person.name,\n\tbreed: person.address.city}"
    );
}

#[test]
fn test_union_without_cast_needs_one() {
    let fixture = Fixture::new(document("Pet", "person.extra"));
    let output = fixture.graph.node(fixture.graph.output_node().unwrap());
    assert_eq!(output.kind, NodeKind::UnionType { requires_cast: true });
}

#[test]
fn test_ambiguous_record_union_needs_cast() {
    for body in ["{}", "{name: person.name}"] {
        let fixture = Fixture::new(document("Pet", body));
        let output = fixture.graph.node(fixture.graph.output_node().unwrap());
        assert_eq!(output.kind, NodeKind::UnionType { requires_cast: true }, "{body}");
        assert!(fixture.graph.find_port("unionType.name").is_none());
    }

    let fixture = Fixture::new(document("Pet", "{name: person.name, breed: \"lab\"}"));
    let output = fixture.graph.node(fixture.graph.output_node().unwrap());
    assert_eq!(output.kind, NodeKind::UnionType { requires_cast: false });
    assert!(fixture.graph.find_port("unionType.breed").is_some());
}

#[test]
fn test_nested_union_port_needs_cast() {
    let fixture = Fixture::new(document("Owner", "{name: person.name, pet: {}}"));
    let pet = fixture.graph.port(fixture.port("mappingConstructor.pet"));
    assert!(pet.requires_cast);
    assert!(!fixture.graph.port(fixture.port("mappingConstructor")).requires_cast);

    let fixture = Fixture::new(document("Owner", "{name: person.name, pet: <Cat>{}}"));
    let pet = fixture.graph.port(fixture.port("mappingConstructor.pet"));
    assert!(!pet.requires_cast);
    assert!(fixture.graph.find_port("mappingConstructor.pet.indoor").is_some());
}

#[test]
fn test_graph_serializes_for_rendering() {
    let fixture = Fixture::new(document("Summary", "{name: person.name}"));
    let json = serde_json::to_value(&fixture.graph).unwrap();
    let ports = json["ports"].as_array().unwrap();
    let name = ports
        .iter()
        .find(|p| p["id"] == "mappingConstructor.name")
        .unwrap();
    assert_eq!(name["direction"], "IN");
    assert_eq!(json["links"].as_array().unwrap().len(), 1);
}
