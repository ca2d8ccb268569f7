//! Benchmark for RDF/XML serialization using city data.
//!
//! Builds a graph of cities, states and countries (from a JSON dump, or a
//! synthetic dataset when no file is given), writes it as RDF/XML with the
//! default and the compact options, and parses both outputs back.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use rdf_xml::vocab::{rdfs, xsd};
use rdf_xml::{GeneratorOptions, Graph, Literal, ResourceId, TypedLiteral, WriteOptions};
use serde::Deserialize;

// =============================================================================
// VOCABULARY
// =============================================================================

const GEO: &str = "http://example.org/geo/";
const DATA: &str = "http://example.org/data/";

/// Property IRIs
mod props {
    pub const CODE: &str = "http://example.org/geo/code";
    pub const NATIVE_NAME: &str = "http://example.org/geo/nativeName";
    pub const POPULATION: &str = "http://example.org/geo/population";
    pub const LATITUDE: &str = "http://example.org/geo/latitude";
    pub const LONGITUDE: &str = "http://example.org/geo/longitude";
    pub const TIMEZONE: &str = "http://example.org/geo/timezone";
    pub const WIKIDATA_ID: &str = "http://example.org/geo/wikidataId";
    pub const CITY_TYPE: &str = "http://example.org/geo/cityType";
    pub const IN_STATE: &str = "http://example.org/geo/inState";
    pub const IN_COUNTRY: &str = "http://example.org/geo/inCountry";
}

/// Type local names
mod types {
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const COUNTRY: &str = "Country";
}

const LANGUAGES: [&str; 19] = [
    "br", "ko", "pt-BR", "pt", "nl", "hr", "fa", "de", "es", "fr", "ja", "it", "zh-CN", "tr",
    "ru", "uk", "pl", "ar", "hi",
];

// =============================================================================
// JSON DATA STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct City {
    id: u32,
    name: String,
    state_id: u32,
    state_code: String,
    state_name: String,
    country_id: u32,
    country_code: String,
    country_name: String,
    latitude: String,
    longitude: String,
    native: Option<String>,
    #[serde(rename = "type")]
    city_type: Option<String>,
    population: Option<i64>,
    timezone: Option<String>,
    translations: Option<std::collections::HashMap<String, String>>,
    #[serde(rename = "wikiDataId")]
    wikidata_id: Option<String>,
}

/// Deterministic stand-in for the JSON dump.
fn synthetic_cities(count: u32) -> Vec<City> {
    (0..count)
        .map(|i| {
            let state_id = i / 40;
            let country_id = state_id / 25;
            let translations = LANGUAGES
                .iter()
                .take((i % 4) as usize)
                .map(|lang| (lang.to_string(), format!("City {} ({})", i, lang)))
                .collect();
            City {
                id: i,
                name: format!("City {}", i),
                state_id,
                state_code: format!("S{}", state_id),
                state_name: format!("State {}", state_id),
                country_id,
                country_code: format!("C{}", country_id),
                country_name: format!("Country {}", country_id),
                latitude: format!("{:.5}", (i % 180) as f64 - 90.0 + 0.12345),
                longitude: format!("{:.5}", (i % 360) as f64 - 180.0 + 0.54321),
                native: (i % 3 == 0).then(|| format!("Stadt {}", i)),
                city_type: (i % 5 == 0).then(|| "capital".to_string()),
                population: (i % 2 == 0).then_some(1_000 + i as i64 * 37),
                timezone: Some(format!("Zone/{}", country_id)),
                translations: Some(translations),
                wikidata_id: (i % 7 == 0).then(|| format!("Q{}", 1_000_000 + i)),
            }
        })
        .collect()
}

// =============================================================================
// CONVERSION TO RESOURCES
// =============================================================================

fn entity_uri(kind: &str, id: u32) -> String {
    format!("{}{}/{}", DATA, kind, id)
}

fn add_text(graph: &mut Graph, id: ResourceId, property: &str, text: &str) {
    graph
        .add_property_uri(id, property, Literal::plain(text))
        .expect("Failed to add property");
}

fn add_typed(graph: &mut Graph, id: ResourceId, property: &str, literal: TypedLiteral) {
    graph
        .add_property_uri(id, property, Literal::from(literal))
        .expect("Failed to add property");
}

fn add_link(graph: &mut Graph, id: ResourceId, property: &str, target: ResourceId) {
    graph
        .add_property_uri(id, property, target)
        .expect("Failed to add property");
}

fn build_city(graph: &mut Graph, city: &City, state: ResourceId, country: ResourceId) {
    let id = graph.locate_typed_resource(&entity_uri("city", city.id), GEO, types::CITY);
    add_text(graph, id, rdfs::LABEL, &city.name);

    // Native name
    if let Some(ref native) = city.native {
        if !native.is_empty() {
            add_text(graph, id, props::NATIVE_NAME, native);
        }
    }

    // City type
    if let Some(ref city_type) = city.city_type {
        add_text(graph, id, props::CITY_TYPE, city_type);
    }

    // Population
    if let Some(population) = city.population {
        add_typed(graph, id, props::POPULATION, TypedLiteral::integer(population));
    }

    // Location
    if let (Ok(lat), Ok(lon)) = (city.latitude.parse::<f64>(), city.longitude.parse::<f64>()) {
        add_typed(graph, id, props::LATITUDE, TypedLiteral::from_value(lat, xsd::DOUBLE));
        add_typed(graph, id, props::LONGITUDE, TypedLiteral::from_value(lon, xsd::DOUBLE));
    }

    // Timezone
    if let Some(ref tz) = city.timezone {
        add_text(graph, id, props::TIMEZONE, tz);
    }

    // Wikidata ID
    if let Some(ref wiki_id) = city.wikidata_id {
        add_text(graph, id, props::WIKIDATA_ID, wiki_id);
    }

    // Translations (language-tagged labels)
    if let Some(ref translations) = city.translations {
        let mut languages: Vec<&String> = translations.keys().collect();
        languages.sort();
        for language in languages {
            if LANGUAGES.contains(&language.as_str()) {
                graph
                    .add_property_uri(
                        id,
                        rdfs::LABEL,
                        Literal::with_language(translations[language].as_str(), language),
                    )
                    .expect("Failed to add translation");
            }
        }
    }

    add_link(graph, id, props::IN_STATE, state);
    add_link(graph, id, props::IN_COUNTRY, country);
}

fn convert_cities_to_graph(cities: &[City]) -> Graph {
    let mut graph = Graph::new();

    // Track created states and countries for deduplication
    let mut created_states: HashSet<u32> = HashSet::new();
    let mut created_countries: HashSet<u32> = HashSet::new();

    for city in cities {
        let country_uri = entity_uri("country", city.country_id);
        let country = graph.locate_typed_resource(&country_uri, GEO, types::COUNTRY);
        if created_countries.insert(city.country_id) {
            add_text(&mut graph, country, rdfs::LABEL, &city.country_name);
            add_text(&mut graph, country, props::CODE, &city.country_code);
        }

        let state_uri = entity_uri("state", city.state_id);
        let state = graph.locate_typed_resource(&state_uri, GEO, types::STATE);
        if created_states.insert(city.state_id) {
            add_text(&mut graph, state, rdfs::LABEL, &city.state_name);
            add_text(&mut graph, state, props::CODE, &city.state_code);
            add_link(&mut graph, state, props::IN_COUNTRY, country);
        }

        build_city(&mut graph, city, state, country);
    }

    graph
}

fn described_count(graph: &Graph) -> usize {
    graph
        .resource_ids()
        .filter(|id| !graph.properties(*id).is_empty())
        .count()
}

fn value_count(graph: &Graph) -> usize {
    graph.resource_ids().map(|id| graph.properties(id).len()).sum()
}

/// Writes the graph with `options`, parses it back and checks the counts.
fn round_trip(label: &str, graph: &Graph, options: &GeneratorOptions) -> Vec<u8> {
    let write_start = Instant::now();
    let bytes = rdf_xml::write(graph, options, &WriteOptions::default()).expect("Failed to write");
    let write_time = write_start.elapsed();

    println!("\n{}: {} bytes in {:?}", label, bytes.len(), write_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (bytes.len() as f64 / 1_000_000.0) / write_time.as_secs_f64()
    );

    let parse_start = Instant::now();
    let mut parsed = Graph::new();
    rdf_xml::parse(&mut parsed, &bytes, None).expect("Failed to parse");
    let parse_time = parse_start.elapsed();

    println!("  Parse: {:?}", parse_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (bytes.len() as f64 / 1_000_000.0) / parse_time.as_secs_f64()
    );
    assert_eq!(described_count(&parsed), described_count(graph));
    assert_eq!(value_count(&parsed), value_count(graph));
    bytes
}

fn main() {
    tracing_subscriber::fmt::init();

    let data_path = std::env::args().nth(1);

    let (cities, json_size) = match &data_path {
        Some(path) if Path::new(path).exists() => {
            println!("Loading cities from: {}", path);
            let json_data = fs::read_to_string(path).expect("Failed to read cities.json");
            let parse_start = Instant::now();
            let cities: Vec<City> = serde_json::from_str(&json_data).expect("Failed to parse JSON");
            println!("Loaded {} cities in {:?}", cities.len(), parse_start.elapsed());
            (cities, Some(json_data.len()))
        }
        _ => {
            println!("No data file given, using 20000 synthetic cities");
            (synthetic_cities(20_000), None)
        }
    };

    // Convert to resources
    let convert_start = Instant::now();
    let graph = convert_cities_to_graph(&cities);
    let convert_time = convert_start.elapsed();

    println!(
        "Converted to {} resources in {:?}",
        graph.len(),
        convert_time
    );
    println!(
        "  - {} described resources, {} property values",
        described_count(&graph),
        value_count(&graph)
    );

    let default_options = GeneratorOptions::new().with_prefix("geo", GEO);
    let compact_options = GeneratorOptions::compact().with_prefix("geo", GEO);

    let expanded = round_trip("RDF/XML (default)", &graph, &default_options);
    let compact = round_trip("RDF/XML (compact)", &graph, &compact_options);

    // Verify output is deterministic
    let compact2 =
        rdf_xml::write(&graph, &compact_options, &WriteOptions::default()).expect("Failed to write");
    assert_eq!(compact, compact2, "Output should be deterministic");

    // Write output files
    let parent = data_path
        .as_deref()
        .and_then(|p| Path::new(p).parent())
        .unwrap_or(Path::new("."));
    let output_expanded = parent.join("cities.rdf");
    let output_compact = parent.join("cities.compact.rdf");

    fs::write(&output_expanded, &expanded).expect("Failed to write cities.rdf");
    fs::write(&output_compact, &compact).expect("Failed to write cities.compact.rdf");

    println!("\n=== Output Files ===");
    println!("Default: {}", output_expanded.display());
    println!("Compact: {}", output_compact.display());

    // Summary
    println!("\n=== Summary ===");
    println!("Cities: {}", cities.len());
    println!("Resources: {}", graph.len());
    if let Some(json_size) = json_size {
        println!(
            "JSON size: {} bytes ({:.1} MB)",
            json_size,
            json_size as f64 / 1_000_000.0
        );
    }
    println!(
        "RDF/XML default: {} bytes ({:.1} MB)",
        expanded.len(),
        expanded.len() as f64 / 1_000_000.0
    );
    println!(
        "RDF/XML compact: {} bytes ({:.1} MB)",
        compact.len(),
        compact.len() as f64 / 1_000_000.0
    );
    println!(
        "Compact vs default: {:.1}%",
        100.0 * compact.len() as f64 / expanded.len() as f64
    );
}
