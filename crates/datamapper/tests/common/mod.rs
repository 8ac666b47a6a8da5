#![allow(dead_code)]

use datamapper::{
    DataMapperGraph, LocalTypeService, MapperConfig, Modifications, PortId, Selection,
    build_graph, create_link, delete_link,
};
use datamapper_syntax::{SyntaxTree, parse};

pub const TYPES: &str = r#"
type Address record {
    string city;
    string zip;
};

type Person record {
    string name;
    int age;
    Address address;
    json extra;
};

type Summary record {
    string name;
    int age;
};

type Profile record {
    string name;
    Address home;
};

type Payload record {
    string id;
    json data;
};

type Cat record {
    string name;
    boolean indoor;
};

type Dog record {
    string name;
    string breed;
};

type Pet Cat|Dog;

type Owner record {
    string name;
    Pet pet;
};

type Bag record {
    string name;
    anydata meta;
};
"#;

/// A document holding the shared types and `function f(Person person) returns {output} => {body};`.
pub fn document(output: &str, body: &str) -> String {
    format!("{TYPES}\nfunction f(Person person) returns {output} => {body};\n")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub struct Fixture {
    pub source: String,
    pub tree: SyntaxTree,
    pub graph: DataMapperGraph,
}

impl Fixture {
    pub fn new(source: String) -> Self {
        Self::with_config(source, &MapperConfig::default())
    }

    pub fn with_config(source: String, config: &MapperConfig) -> Self {
        init_tracing();
        let tree = parse(&source).unwrap();
        let graph = {
            let service = LocalTypeService::new(&tree);
            build_graph(&tree, &service, &Selection::function("f"), config).unwrap()
        };
        Self { source, tree, graph }
    }

    pub fn port(&self, id: &str) -> PortId {
        self.graph
            .find_port(id)
            .unwrap_or_else(|| panic!("no port {id}"))
    }

    /// Id of the source port of the first link into `target`.
    pub fn linked_source(&self, target: &str) -> Option<String> {
        let (_, link) = self.graph.links_into(self.port(target)).next()?;
        Some(self.graph.port(link.source).id.clone())
    }

    pub fn link(&self, source: &str, target: &str) -> String {
        let edits = create_link(
            &self.tree,
            &self.graph,
            self.port(source),
            self.port(target),
            &MapperConfig::default(),
        )
        .unwrap();
        self.apply(&edits)
    }

    pub fn delete_into(&self, target: &str) -> String {
        let (index, _) = self.graph.links_into(self.port(target)).next().unwrap();
        let edits = delete_link(&self.tree, &self.graph, index).unwrap();
        self.apply(&edits)
    }

    pub fn apply(&self, edits: &Modifications) -> String {
        edits.apply(&self.source).unwrap()
    }
}

/// The body expression of `f` in an applied document.
pub fn body_of(source: &str) -> &str {
    let start = source.rfind("=> ").unwrap() + 3;
    let end = source.rfind(";\n").unwrap();
    &source[start..end]
}
