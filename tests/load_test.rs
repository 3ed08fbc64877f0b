// Integration tests for the file loader

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use serde_json::json;
use yamlscript::{load, Error, LoadError, LoadOptions, Value};

fn test_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("test_files")
        .join(name)
}

fn context() -> Value {
    Value::from(json!({
        "my_key": "name",
        "my_name": "James",
        "my_int": 10,
        "my": {"name": "David"},
        "names": [{"name": "James"}, {"name": "David"}],
        "ints": [0, 1, 2, 3]
    }))
}

fn options() -> LoadOptions {
    LoadOptions::new().with_context(context())
}

fn expected() -> Value {
    Value::from(json!({
        "enum": {"James": 10, "David": 11},
        "list": ["James", "David"],
        "name": "James"
    }))
}

fn unparsed() -> Value {
    let text = fs::read_to_string(test_file("json_format.json")).unwrap();
    Value::from_json_str(&text).unwrap()
}

#[test]
fn test_load_by_extension() {
    for name in ["json_format.json", "yaml_format.yaml", "yaml_format.yml"] {
        assert_eq!(load(test_file(name), &options()).unwrap(), expected(), "{}", name);
    }
}

#[test]
fn test_load_without_parsing() {
    for name in ["json_format.json", "yaml_format.yaml", "yaml_format.yml"] {
        let result = load(test_file(name), &options().with_parse(false)).unwrap();
        assert_eq!(result, unparsed(), "{}", name);
    }
}

#[test]
fn test_load_with_explicit_file_type() {
    let path = test_file("anonymous_format");
    assert_eq!(load(&path, &options().with_file_type("yaml")).unwrap(), expected());
    assert_eq!(
        load(&path, &options().with_file_type("yaml").with_parse(false)).unwrap(),
        unparsed()
    );
}

#[test]
fn test_unsupported_file_type_is_not_implemented() {
    let err = load(test_file("anonymous_format"), &options().with_file_type("nope")).unwrap_err();
    assert!(err.is_not_implemented());
    assert!(matches!(err, Error::Load(LoadError::NotImplemented(ref t)) if t == "nope"));
}

#[test]
fn test_missing_extension_fails() {
    let err = load(test_file("anonymous_format"), &options()).unwrap_err();
    assert!(!err.is_not_implemented());
    assert!(matches!(err, Error::Load(LoadError::UnknownFormat(_))));
}

#[test]
fn test_directory_and_missing_file_fail() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path(), &options()).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::NotAFile(_))));

    let err = load(dir.path().join("missing.json"), &options()).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::NotAFile(_))));
}

#[test]
fn test_values_override_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.yml");
    fs::write(&path, "greeting: Hello ${my.name}\nlast: ${ints.4}\n").unwrap();

    let options = options()
        .with_value("my/name", "Eve")
        .with_value("ints/-", 4);
    let result = load(&path, &options).unwrap();
    assert_eq!(result, Value::from(json!({"greeting": "Hello Eve", "last": 4})));
}

#[test]
fn test_invalid_document_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{\"a\": ").unwrap();
    let err = load(&path, &options()).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::Json(_))));
}
