use dragon_conf::{global, ConfigError, Format, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serial_test::serial;
use std::collections::HashMap;

const JSON: &str = r#"{
    "name": "app",
    "debug": true,
    "age": 123,
    "map1": {"key": "val1", "key2": "val2"},
    "arr1": ["val", "val1", "val2"]
}"#;

fn reset() {
    global::clear_all();
    global::load_str(Format::Json, JSON).unwrap();
}

#[test]
#[serial]
fn test_scenario_reads() {
    reset();

    assert_eq!(global::get("age"), Some(Value::Int(123)));
    assert_eq!(global::string("arr1.1"), "val1");
    assert!(global::exists("map1.key"));
    assert!(!global::exists_with("map1.key", false));
    assert!(global::ints("arr1").is_empty());
    assert_eq!(global::int("arr1.100"), 0);
    assert_eq!(global::string("arr1"), "[val val1 val2]");
    assert!(global::bool("debug"));
    assert_eq!(global::float_or("missing", 1.5), 1.5);
    assert_eq!(global::int64_or("missing", 34), 34);
    assert_eq!(global::get_as::<Vec<String>>("arr1").unwrap().len(), 3);

    global::clear_all();
}

#[test]
#[serial]
fn test_missing_paths_use_defaults() {
    reset();

    for path in ["notExist", "name.sub", "map1.notExist", "arr1.notExist", "arr1.100", ""] {
        assert!(!global::exists(path), "{path}");
        assert_eq!(global::get(path), None);
        assert_eq!(global::string_or(path, "def"), "def");
        assert_eq!(global::int_or(path, 7), 7);
        assert!(global::bool_or(path, true));
        assert!(global::strings(path).is_empty());
        assert!(global::string_map(path).is_empty());
    }
    assert!(matches!(global::error(), Some(ConfigError::NotFound(_))));

    global::clear_all();
}

#[test]
#[serial]
fn test_set_and_read_back() {
    reset();

    let int_map: HashMap<String, i32> = [("a".to_string(), 1), ("b".to_string(), 2)]
        .into_iter()
        .collect();
    global::set("intMap0", &int_map).unwrap();
    assert_eq!(global::int_map("intMap0")["a"], 1);
    assert_eq!(global::get("intMap0.b"), Some(Value::Int(2)));

    global::set("flVal", &23.45).unwrap();
    assert_eq!(global::float("flVal"), 23.45);

    global::set("nullable", &Option::<i32>::None).unwrap();
    assert!(global::exists("nullable"));
    assert_eq!(global::get_value("nullable", true), Some(Value::Null));

    assert!(global::set("name.sub", "x").is_err());
    assert!(matches!(
        global::error(),
        Some(ConfigError::PathBlocked { .. })
    ));

    global::clear_all();
}

#[test]
#[serial]
fn test_map_struct_section() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Section {
        age: i32,
        tags: Vec<i32>,
    }

    global::clear_all();
    global::load_data(&json!({"sec": {"key": "val", "age": 120, "tags": [12, 34]}})).unwrap();

    let mut section = Section::default();
    global::map_struct("sec", &mut section).unwrap();
    assert_eq!(section.age, 120);
    assert_eq!(section.tags, vec![12, 34]);

    global::clear_all();
}

#[test]
#[serial]
fn test_clear_all_twice() {
    reset();
    global::get("missing");
    assert!(global::error().is_some());

    global::clear_all();
    global::clear_all();
    assert!(global::is_empty());
    assert!(global::data().is_empty());
    assert_eq!(global::error(), None);
}

#[test]
#[serial]
fn test_default_store_guard() {
    global::clear_all();
    {
        let mut store = global::default_store();
        store.set("guarded.value", &5).unwrap();
        assert_eq!(store.int("guarded.value"), 5);
    }
    assert_eq!(global::int("guarded.value"), 5);
    global::clear_all();
}
