use super::args::{CliArgs, Command};
use super::driver::{AnalysisReport, analyze, rewrite, run};
use erasure_expr::{BinaryOp, Expr, ExprBuilder, SubstitutorOptions, Value, codec, find_entity_types};
use erasure_types::{
    ConstructorInfo, DefinitionInfo, EnumValueInfo, MemberInfo, ParamInfo, TypeId, TypeInterner,
};
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `q => q.Baz == 1 && Color.Green is object` over an entity `Qux` and a
/// mapped enum `Color`.
fn sample_document() -> Json {
    let interner = TypeInterner::new();
    let atom = |s: &str| interner.intern_string(s);
    let qux = interner.define(
        DefinitionInfo::class(atom("Qux"))
            .with_members(vec![
                MemberInfo::property(atom("Baz"), TypeId::INT32).mapped(atom("baz")),
                MemberInfo::property(atom("Foo"), TypeId::STRING).mapped(atom("foo")),
            ])
            .with_constructor(ConstructorInfo::new(vec![
                ParamInfo::new(atom("baz"), TypeId::INT32).mapped(atom("baz")),
            ])),
    );
    let color = interner.define(DefinitionInfo::enumeration(
        atom("Color"),
        vec![
            EnumValueInfo::new(atom("Red"), 0).mapped(atom("red")),
            EnumValueInfo::new(atom("Green"), 1).mapped(atom("green")),
        ],
    ));

    let b = ExprBuilder::new(&interner);
    let q = b.parameter("q", qux);
    let baz = b.member(Some(Expr::parameter(&q)), qux, "Baz").unwrap();
    let is_one = b
        .binary(BinaryOp::Equal, baz, b.value(Value::Int32(1)))
        .unwrap();
    let green = b.constant(Value::Enum { ty: color, value: 1 }, color);
    let body = b
        .binary(BinaryOp::AndAlso, is_one, b.type_is(green, TypeId::OBJECT))
        .unwrap();
    let lambda = b.lambda(vec![q], body).unwrap();
    codec::serialize(&interner, &lambda).unwrap()
}

fn write_document(dir: &TempDir, name: &str, document: &Json) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    path
}

fn analyze_document(document: &Json) -> AnalysisReport {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "doc.json", document);
    analyze(&path).unwrap()
}

fn run_to_string(command: Command) -> anyhow::Result<String> {
    let mut out = Vec::new();
    run(&CliArgs { command }, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_analyze_reports_entities_and_enums() {
    let report = analyze_document(&sample_document());
    assert_eq!(report.entities, vec!["Qux".to_string()]);
    assert_eq!(report.enums, vec!["Color".to_string()]);
}

#[test]
fn test_rewrite_removes_entity_types() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "query.json", &sample_document());

    let document = rewrite(&path, SubstitutorOptions::default()).unwrap();
    let interner = TypeInterner::new();
    let expr = codec::deserialize(&interner, &document).unwrap();
    assert!(find_entity_types(&interner, &expr).is_empty());
    assert!(analyze_document(&document).entities.is_empty());
}

#[test]
fn test_rewrite_can_keep_enums() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "query.json", &sample_document());
    let options = SubstitutorOptions::from_json(r#"{"eraseEnums":false}"#).unwrap();

    let report = analyze_document(&rewrite(&path, options).unwrap());
    assert!(report.entities.is_empty());
    assert_eq!(report.enums, vec!["Color".to_string()]);
}

#[test]
fn test_run_prints_documents() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "query.json", &sample_document());

    let compact = run_to_string(Command::Rewrite {
        file: path.clone(),
        options: None,
        compact: true,
    })
    .unwrap();
    assert_eq!(compact.lines().count(), 1);
    let parsed: Json = serde_json::from_str(&compact).unwrap();
    assert_eq!(parsed["version"], Json::from(codec::FORMAT_VERSION));

    let pretty = run_to_string(Command::Rewrite {
        file: path.clone(),
        options: None,
        compact: false,
    })
    .unwrap();
    assert!(pretty.lines().count() > 1);
    assert_eq!(serde_json::from_str::<Json>(&pretty).unwrap(), parsed);

    let report = run_to_string(Command::Analyze { file: path }).unwrap();
    let report: Json = serde_json::from_str(&report).unwrap();
    assert_eq!(report["entities"], serde_json::json!(["Qux"]));
}

#[test]
fn test_errors_carry_context() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.json");
    let err = analyze(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read"));

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    let err = analyze(&garbage).unwrap_err();
    assert!(format!("{err:#}").contains("not valid JSON"));

    let old = write_document(&dir, "old.json", &serde_json::json!({ "version": 0 }));
    let err = analyze(&old).unwrap_err();
    assert!(format!("{err:#}").contains("failed to decode"));

    let path = write_document(&dir, "query.json", &sample_document());
    let err = run_to_string(Command::Rewrite {
        file: path,
        options: Some(r#"{"maxDepth":0}"#.to_string()),
        compact: false,
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("invalid --options"));
}

#[test]
fn test_depth_limit_aborts_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "query.json", &sample_document());
    let options = SubstitutorOptions::from_json(r#"{"maxDepth":1}"#).unwrap();
    let err = rewrite(Path::new(&path), options).unwrap_err();
    assert!(format!("{err:#}").contains("failed to rewrite"));
}
