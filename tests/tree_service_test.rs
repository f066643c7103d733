//! Tests for TreeService over JSON record files

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use flatree::application::services::TreeService;
use flatree::application::ApplicationError;
use flatree::config::TreeSettings;
use flatree::domain::collection::SortOrder;
use flatree::domain::{DomainError, DuplicatePolicy, RecordKey};
use flatree::infrastructure::traits::RealFileSystem;

/// Helper to write a record file for testing
fn write_records(dir: &TempDir, name: &str, records: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, records.to_string()).expect("write records");
    path
}

fn service(settings: TreeSettings) -> TreeService {
    TreeService::new(Arc::new(RealFileSystem), settings)
}

fn menu() -> Value {
    json!([
        {"id": 1, "parentId": null, "name": "root"},
        {"id": 2, "parentId": 1, "name": "docs"},
        {"id": 3, "parentId": 1, "name": "src"},
        {"id": 4, "parentId": "3", "name": "lib"}
    ])
}

fn names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn given_menu_file_when_building_json_then_children_nested_in_order() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());

    // Act
    let out = service(TreeSettings::default()).build_json(&file).unwrap();
    let forest: Value = serde_json::from_str(&out).unwrap();

    // Assert
    assert_eq!(names(&forest), vec!["root"]);
    let children = &forest[0]["children"];
    assert_eq!(names(children), vec!["docs", "src"]);
    assert_eq!(names(&children[1]["children"]), vec!["lib"]);
    assert_eq!(children[0]["children"], json!([]));
}

#[test]
fn given_menu_file_when_building_then_file_is_unchanged() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());
    let before = std::fs::read_to_string(&file).unwrap();

    service(TreeSettings::default()).build_json(&file).unwrap();

    assert_eq!(std::fs::read_to_string(&file).unwrap(), before);
}

#[test]
fn given_custom_field_names_when_building_then_selector_applies() {
    let temp = TempDir::new().unwrap();
    let file = write_records(
        &temp,
        "custom.json",
        &json!([
            {"uid": "a", "pid": "0", "name": "top"},
            {"uid": "b", "pid": "a", "name": "child"}
        ]),
    );
    let settings = TreeSettings {
        id_field: "uid".into(),
        parent_field: "pid".into(),
        children_field: "kids".into(),
        key_field: Some("key".into()),
        root: "0".into(),
        ..TreeSettings::default()
    };

    let out = service(settings).build_json(&file).unwrap();
    let forest: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(forest[0]["key"], json!("a"));
    assert_eq!(forest[0]["kids"][0]["name"], json!("child"));
    assert_eq!(forest[0]["kids"][0]["key"], json!("b"));
    assert!(forest[0].get("children").is_none());
}

#[test]
fn given_sort_by_field_when_building_then_siblings_sorted() {
    let temp = TempDir::new().unwrap();
    let file = write_records(
        &temp,
        "sorted.json",
        &json!([
            {"id": 1, "parentId": null, "name": "root", "rank": 0},
            {"id": 2, "parentId": 1, "name": "b", "rank": 2},
            {"id": 3, "parentId": 1, "name": "a", "rank": 1},
            {"id": 4, "parentId": 1, "name": "c", "rank": 3}
        ]),
    );
    let settings = TreeSettings {
        sort_by: Some("rank".into()),
        sort_order: SortOrder::Desc,
        ..TreeSettings::default()
    };

    let out = service(settings).build_json(&file).unwrap();
    let forest: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(names(&forest[0]["children"]), vec!["c", "b", "a"]);
}

#[test]
fn given_numeric_string_parent_when_tracing_ancestors_then_matches_integer_id() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());

    let path = service(TreeSettings::default())
        .ancestors(&file, &RecordKey::Int(4))
        .unwrap();

    let keys: Vec<RecordKey> = path.iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, vec![RecordKey::Int(3), RecordKey::Int(1)]);
}

#[test]
fn given_root_when_collecting_descendants_then_records_json_is_flat() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());
    let service = service(TreeSettings::default());

    let below = service.descendants(&file, &RecordKey::Int(1)).unwrap();
    let out: Value = serde_json::from_str(&service.records_json(&below).unwrap()).unwrap();

    assert_eq!(names(&out), vec!["docs", "src", "lib"]);
    assert!(out[0].get("children").is_none());
}

#[test]
fn given_duplicates_when_strict_then_domain_error() {
    let temp = TempDir::new().unwrap();
    let file = write_records(
        &temp,
        "dup.json",
        &json!([{"id": 1, "parentId": null}, {"id": 1, "parentId": null}]),
    );
    let settings = TreeSettings {
        duplicates: DuplicatePolicy::Reject,
        ..TreeSettings::default()
    };

    let err = service(settings).build(&file).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::DuplicateId { .. })
    ));
}

#[test]
fn given_messy_file_when_checking_then_reports_every_problem() {
    let temp = TempDir::new().unwrap();
    let file = write_records(
        &temp,
        "messy.json",
        &json!([
            {"id": 1, "parentId": null},
            {"id": 1, "parentId": null},
            {"id": 2, "parentId": 77},
            {"id": 3, "parentId": 4},
            {"id": 4, "parentId": 3}
        ]),
    );

    let report = service(TreeSettings::default()).check(&file).unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.records, 5);
    assert_eq!(report.duplicates, vec![RecordKey::Int(1)]);
    assert_eq!(report.orphans, vec![RecordKey::Int(2)]);
    assert!(report.cycle.is_some());
    assert_eq!(report.depth, 0);
}

#[test]
fn given_clean_file_when_checking_then_clean_report() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());

    let report = service(TreeSettings::default()).check(&file).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.top_level, 1);
    assert_eq!(report.depth, 3);
}

#[test]
fn given_label_field_when_drawing_then_labels_follow_ids() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());
    let settings = TreeSettings {
        label_field: Some("name".into()),
        ..TreeSettings::default()
    };

    let diagrams = service(settings).diagram(&file).unwrap();
    let text = diagrams[0].to_string();

    assert!(text.starts_with("1 root"));
    assert!(text.contains("4 lib"));
}

#[test]
fn given_missing_file_when_loading_then_not_found() {
    let err = service(TreeSettings::default())
        .load(Path::new("/nonexistent/records.json"))
        .unwrap_err();
    assert!(matches!(err, ApplicationError::NotFound { .. }));
}

#[test]
fn given_invalid_json_when_loading_then_invalid_input() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "[{\"id\": 1,").unwrap();

    let err = service(TreeSettings::default()).load(&path).unwrap_err();

    assert!(matches!(err, ApplicationError::InvalidInput { .. }));
}

#[test]
fn given_record_without_id_when_loading_then_invalid_argument() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "noid.json", &json!([{"parentId": null}]));

    let err = service(TreeSettings::default()).load(&file).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidArgument(_))
    ));
}

/// In-memory filesystem: one fixed file
struct MemoryFs {
    path: PathBuf,
    content: String,
}

impl flatree::infrastructure::traits::FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        if path == self.path {
            Ok(self.content.clone())
        } else {
            Err(std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        path == self.path
    }
}

#[test]
fn given_in_memory_fs_when_building_then_service_reads_through_trait() {
    let fs = MemoryFs {
        path: PathBuf::from("/virtual/menu.json"),
        content: menu().to_string(),
    };
    let service = TreeService::new(Arc::new(fs), TreeSettings::default());

    let forest = service.build(Path::new("/virtual/menu.json")).unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 2);
}

fn chain(depth: i64) -> Value {
    Value::Array(
        (1..=depth)
            .map(|i| {
                let parent = if i == 1 { Value::Null } else { json!(i - 1) };
                json!({"id": i, "parentId": parent})
            })
            .collect(),
    )
}

#[test]
fn given_chain_deeper_than_max_depth_when_rendering_then_invalid_argument() {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "deep.json", &chain(20_000));
    let service = service(TreeSettings::default());

    let json_err = service.build_json(&file).unwrap_err();
    let diagram_err = service.diagram(&file).unwrap_err();

    for err in [json_err, diagram_err] {
        assert!(
            matches!(err, ApplicationError::Domain(DomainError::InvalidArgument(ref m)) if m.contains("max_depth")),
            "{}",
            err
        );
    }
    // building without rendering has no depth limit
    assert_eq!(service.build(&file).unwrap()[0].depth(), 20_000);
}

#[rstest::rstest]
#[case::at_limit(3, true)]
#[case::below_depth(2, false)]
fn given_max_depth_when_rendering_menu_then_limit_is_inclusive(
    #[case] max_depth: usize,
    #[case] ok: bool,
) {
    let temp = TempDir::new().unwrap();
    let file = write_records(&temp, "menu.json", &menu());
    let settings = TreeSettings {
        max_depth,
        ..TreeSettings::default()
    };

    assert_eq!(service(settings).build_json(&file).is_ok(), ok);
}

#[test]
fn given_drop_empty_when_building_json_then_empty_fields_left_out() {
    let temp = TempDir::new().unwrap();
    let file = write_records(
        &temp,
        "sparse.json",
        &json!([{"id": 1, "parentId": null, "name": "root", "icon": ""}]),
    );
    let settings = TreeSettings {
        drop_empty: true,
        ..TreeSettings::default()
    };

    let out = service(settings).build_json(&file).unwrap();
    let forest: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(forest, json!([{"id": 1, "name": "root", "children": []}]));
}
