//! File-backed layers: attach, reload and reset against a real directory.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::json;
use strata_core::{Error, LayerCategory, LayeredResolver, SettingsSources, Value};

fn write(path: &Path, content: &str) {
    fs::write(path, content).expect("write settings fixture");
}

#[test]
fn attaches_files_in_category_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    let plugin = dir.path().join("lint.yaml");
    let user = dir.path().join("user.toml");
    write(
        &global,
        r#"{"editor": {"font.size": 12, "wrap": false}, "features": {"x": true, "y": false}}"#,
    );
    write(&plugin, "editor:\n  wrap: true\nlint:\n  level: warn\n");
    write(&user, "[editor]\n\"font.size\" = 14\n\n[features]\ny = true\nz = true\n");

    let mut sources = SettingsSources::new();
    // Added out of priority order on purpose; categories decide the stack.
    sources.add(&user, LayerCategory::User).expect("add user");
    sources.add(&global, LayerCategory::Global).expect("add global");
    sources.add(&plugin, LayerCategory::Plugin).expect("add plugin");

    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("attach sources");

    let categories: Vec<LayerCategory> = resolver
        .layers()
        .into_iter()
        .map(|info| info.category)
        .collect();
    assert_eq!(
        categories,
        vec![
            LayerCategory::Global,
            LayerCategory::Plugin,
            LayerCategory::User,
            LayerCategory::Runtime,
        ]
    );

    assert_eq!(resolver.get("editor.font.size").expect("valid"), Some(Value::from(14)));
    assert_eq!(resolver.get("editor.wrap").expect("valid"), Some(Value::from(true)));
    assert_eq!(
        resolver.get("lint.level").expect("valid"),
        Some(Value::from("warn"))
    );
    assert_eq!(
        resolver
            .get_merged("features")
            .expect("valid")
            .map(|value| value.to_json()),
        Some(json!({ "x": true, "y": true, "z": true }))
    );
}

#[test]
fn reload_swaps_file_layers_and_keeps_runtime() {
    let dir = tempfile::tempdir().expect("tempdir");
    let user = dir.path().join("user.json");
    write(&user, r#"{"timeout": 10}"#);

    let mut sources = SettingsSources::new();
    let name = sources
        .add(&user, LayerCategory::User)
        .expect("add user")
        .name
        .clone();
    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("attach");
    resolver.set("session.id", "abc").expect("runtime write");

    let snapshot = resolver.layer(&name).expect("user layer");
    write(&user, r#"{"timeout": 30}"#);
    sources.reload(&mut resolver).expect("reload");

    assert_eq!(resolver.get("timeout").expect("valid"), Some(Value::from(30)));
    assert_eq!(snapshot.get("timeout").expect("valid"), Some(&Value::from(10)));
    assert_eq!(
        resolver.get("session.id").expect("valid"),
        Some(Value::from("abc"))
    );
}

#[test]
fn missing_file_is_empty_until_it_appears() {
    let dir = tempfile::tempdir().expect("tempdir");
    let user = dir.path().join("later.json");

    let mut sources = SettingsSources::new();
    sources.add(&user, LayerCategory::User).expect("add user");
    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("missing file attaches empty");
    assert_eq!(resolver.get("theme").expect("valid"), None);

    write(&user, r#"{"theme": "dark"}"#);
    sources.reload(&mut resolver).expect("reload");
    assert_eq!(resolver.get("theme").expect("valid"), Some(Value::from("dark")));
}

#[test]
fn failed_reload_leaves_every_layer_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    let user = dir.path().join("user.json");
    write(&global, r#"{"a": 1}"#);
    write(&user, r#"{"b": 2}"#);

    let mut sources = SettingsSources::new();
    sources.add(&global, LayerCategory::Global).expect("add global");
    sources.add(&user, LayerCategory::User).expect("add user");
    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("attach");

    write(&global, r#"{"a": 100}"#);
    write(&user, "{ not json");
    let error = sources.reload(&mut resolver).expect_err("user file is malformed");
    assert!(matches!(error, Error::Config(_)));
    assert!(error.to_string().contains("user.json"));

    assert_eq!(resolver.get("a").expect("valid"), Some(Value::from(1)));
    assert_eq!(resolver.get("b").expect("valid"), Some(Value::from(2)));
}

#[test]
fn conflicting_dotted_keys_report_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    write(&global, r#"{"a": 1, "a.b": 2}"#);

    let mut sources = SettingsSources::new();
    sources.add(&global, LayerCategory::Global).expect("add global");
    let mut resolver = LayeredResolver::new();
    let error = sources.attach(&mut resolver).expect_err("a is a scalar");
    assert!(matches!(error, Error::Addressing(_)));
    assert!(error.to_string().contains("global.json"));
}

#[test]
fn unreadable_source_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    fs::create_dir(&global).expect("directory in place of the file");

    let mut sources = SettingsSources::new();
    sources.add(&global, LayerCategory::Global).expect("add global");
    let mut resolver = LayeredResolver::new();
    let error = sources.attach(&mut resolver).expect_err("a directory cannot be read");
    assert!(matches!(error, Error::Io(_)));
    assert_eq!(resolver.layers().len(), 1);
}

#[test]
fn custom_separator_applies_to_file_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    write(&global, r#"{"net/proxy": {"host": "localhost"}, "version.major": 2}"#);

    let mut sources = SettingsSources::with_separator('/');
    sources.add(&global, LayerCategory::Global).expect("add global");
    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("attach");

    let name = sources.entries()[0].name.clone();
    let layer = resolver.layer(&name).expect("global layer");
    assert_eq!(
        layer.get("net/proxy/host").expect("valid"),
        Some(&Value::from("localhost"))
    );
    assert_eq!(layer.get("version.major").expect("valid"), Some(&Value::from(2)));
}

#[test]
fn reset_removes_file_layers_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global.json");
    write(&global, r#"{"a": 1}"#);

    let mut sources = SettingsSources::new();
    sources.add(&global, LayerCategory::Global).expect("add global");
    let mut resolver = LayeredResolver::new();
    sources.attach(&mut resolver).expect("attach");
    resolver.set("a", 5).expect("runtime write");

    sources.reset(&mut resolver).expect("reset");
    assert!(sources.entries().is_empty());
    assert_eq!(resolver.layers().len(), 1);
    assert_eq!(resolver.get("a").expect("valid"), Some(Value::from(5)));
}

#[test]
fn rejects_runtime_and_duplicate_sources() {
    let mut sources = SettingsSources::new();
    let error = sources
        .add("runtime.json", LayerCategory::Runtime)
        .expect_err("runtime is not file backed");
    assert!(matches!(error, Error::Layer(_)));

    sources.add("user.json", LayerCategory::User).expect("first add");
    let error = sources
        .add("user.json", LayerCategory::User)
        .expect_err("duplicate source");
    assert!(error.to_string().contains("already added"));
}
