//! Simple dumper to inspect RDF/XML files.

use std::fs;

use rdf_xml::{parse, Graph, Literal, ResourceId, Value};

fn format_literal(literal: &Literal) -> String {
    let lexical = literal.lexical_form();
    let preview: String = lexical.chars().take(80).collect();
    let quoted = if lexical.chars().count() > 80 {
        format!("\"{}...\"", preview)
    } else {
        format!("\"{}\"", preview)
    };
    match (literal.language(), literal.datatype()) {
        (Some(language), _) => format!("{}@{}", quoted, language),
        (None, Some(datatype)) => format!("{}^^<{}>", quoted, datatype),
        (None, None) => quoted,
    }
}

fn format_value(graph: &Graph, value: &Value) -> String {
    match value {
        Value::Resource(id) => graph.describe(*id),
        Value::Literal(literal) => format_literal(literal),
    }
}

fn dump_resource(graph: &Graph, id: ResourceId) {
    println!("{} ({})", graph.describe(id), graph.kind(id).name());
    for pv in graph.properties(id) {
        println!(
            "  {} -> {}",
            graph.describe(pv.property),
            format_value(graph, &pv.value)
        );
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/sample.rdf".to_string());
    let base = args.next();

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let mut graph = Graph::new();
    let roots = parse(&mut graph, &data, base.as_deref()).expect("Failed to parse");

    println!("\n=== Top-level resources ({}) ===", roots.len());
    for id in &roots {
        println!("  {}", graph.describe(*id));
    }

    let described: Vec<ResourceId> = graph
        .resource_ids()
        .filter(|id| !graph.properties(*id).is_empty())
        .collect();
    let blank = described.iter().filter(|id| graph.is_blank(**id)).count();
    let statements: usize = described.iter().map(|id| graph.properties(*id).len()).sum();

    println!("\n=== Summary ===");
    println!("Resources: {}", graph.len());
    println!("Described: {} ({} blank)", described.len(), blank);
    println!("Property values: {}", statements);

    println!("\n=== Resources ===");
    for id in described {
        dump_resource(&graph, id);
    }
}
