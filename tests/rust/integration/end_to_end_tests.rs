//! Configuration file to compiled query, then SPARQL JSON results to trees.

use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;
use viewgraph::config::CompilerConfig;
use viewgraph::endpoint::EndpointCatalog;
use viewgraph::result_tree::SparqlJsonRowSource;

const VIEWS: &str = r#"
name: flood-monitoring
prefixes:
  rt: http://ex.org/rt/
views:
  warning:
    - prop: rt:severityLevel
      name: severity
      type: xsd:integer
    - { prop: rt:message, optional: true }
    - prop: rt:floodArea
      optional: true
      nested:
        - rt:notation
        - { prop: rt:county, optional: true }
endpoints:
  - name: warnings
    view: warning
    baseQuery: "?id a rt:FloodWarning ."
    softLimit: 10
    limit: 50
"#;

const RESULTS: &str = r#"{
  "head": { "vars": ["id", "severity", "message", "floodArea", "floodArea_notation", "floodArea_county"] },
  "results": { "bindings": [
    {
      "id": { "type": "uri", "value": "http://ex.org/w1" },
      "severity": { "type": "literal", "value": "3", "datatype": "http://www.w3.org/2001/XMLSchema#integer" },
      "floodArea": { "type": "uri", "value": "http://ex.org/fa1" },
      "floodArea_notation": { "type": "literal", "value": "062FWF46Harbourne" },
      "floodArea_county": { "type": "literal", "value": "Devon" }
    },
    {
      "id": { "type": "uri", "value": "http://ex.org/w2" },
      "severity": { "type": "literal", "value": "1", "datatype": "http://www.w3.org/2001/XMLSchema#integer" },
      "message": { "type": "literal", "value": "Severe flooding", "xml:lang": "en" }
    }
  ] }
}"#;

fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_to_query() {
    let views = temp_file(VIEWS);
    let catalog = EndpointCatalog::from_yaml_file(views.path(), &CompilerConfig::default()).unwrap();
    let endpoint = catalog.get("warnings").unwrap();

    let params = vec![
        ("floodArea.county".to_string(), "Devon".to_string()),
        ("_sort".to_string(), "-severity".to_string()),
    ];
    let query = endpoint.compile(&params).unwrap();
    assert!(query.starts_with("PREFIX rt: <http://ex.org/rt/>\n"));
    assert!(query.contains("FILTER(?floodArea_county = \"Devon\")"));
    assert!(query.contains("(MAX(?severity) AS ?_sort0)"));
    assert!(query.contains("LIMIT 10\n"));
    assert!(query.trim_end().ends_with("ORDER BY DESC(?_sort0) ?id"));
}

#[test]
fn test_results_file_to_trees() -> anyhow::Result<()> {
    let views = temp_file(VIEWS);
    let results = temp_file(RESULTS);
    let catalog = EndpointCatalog::from_yaml_file(views.path(), &CompilerConfig::default())?;
    let endpoint = catalog.get("warnings").unwrap();

    let source = SparqlJsonRowSource::from_file(results.path())?;
    let trees = endpoint
        .coalesce(None, source)?
        .map(|tree| tree.map(|t| t.to_json()))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        trees,
        vec![
            json!({
                "@id": "http://ex.org/w1",
                "severity": 3,
                "floodArea": {
                    "@id": "http://ex.org/fa1",
                    "notation": "062FWF46Harbourne",
                    "county": "Devon"
                }
            }),
            json!({
                "@id": "http://ex.org/w2",
                "severity": 1,
                "message": { "@value": "Severe flooding", "@language": "en" }
            }),
        ]
    );
    Ok(())
}

#[test]
fn test_missing_results_file() {
    let err = SparqlJsonRowSource::from_file("/nonexistent/results.json").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/results.json"));
}
