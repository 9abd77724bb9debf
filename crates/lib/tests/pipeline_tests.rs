//! End-to-end builds over small on-disk projects.

use std::fs;
use std::path::Path;

use hashpack_lib::config::{ConfigError, RawConfig};
use hashpack_lib::graph::GraphError;
use hashpack_lib::manifest::FileKind;
use hashpack_lib::{BuildConfig, BuildError, BuildWarning, ConfigOverrides, Mode, build};
use tempfile::TempDir;

fn project(files: &[(&str, &[u8])]) -> TempDir {
  let temp = TempDir::new().unwrap();
  for (path, content) in files {
    let path = temp.path().join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }
  temp
}

fn config(root: &Path, mode: Mode) -> BuildConfig {
  let overrides = ConfigOverrides {
    mode: Some(mode),
    ..Default::default()
  };
  BuildConfig::from_raw(RawConfig::default(), root, &overrides).unwrap()
}

fn output_files(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(dir)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}

fn script_of(report: &hashpack_lib::BuildReport) -> String {
  let name = &report.manifest.get("script").unwrap()[0];
  fs::read_to_string(report.out_dir.join(name)).unwrap()
}

#[tokio::test]
async fn small_assets_are_inlined() {
  let photo = vec![0xFFu8; 2048];
  let temp = project(&[
    (
      "src/index.js",
      b"import photo from \"./photo.jpg\";\nimport note from \"./note.txt\";\nconsole.log(photo, note);\n",
    ),
    ("src/photo.jpg", photo.as_slice()),
    ("src/note.txt", b"remember the milk"),
  ]);

  let report = build(&config(temp.path(), Mode::Production)).await.unwrap();

  let files = output_files(&report.out_dir);
  assert_eq!(files.len(), 2, "{files:?}");
  assert!(files.iter().any(|f| f.ends_with(".js")));
  assert!(files.contains(&"index.html".to_string()));
  assert!(report.warnings.is_empty(), "{:?}", report.warnings);

  let script = script_of(&report);
  assert!(script.contains("data:image/jpeg;base64,"));
  assert!(script.contains("remember the milk"));
}

#[tokio::test]
async fn large_assets_are_emitted_with_hashed_names() {
  let logo = vec![0x42u8; 10 * 1024];
  let temp = project(&[
    ("src/index.js", b"import logo from \"./logo.png\";\nconsole.log(logo);\n"),
    ("src/logo.png", logo.as_slice()),
  ]);

  let report = build(&config(temp.path(), Mode::Production)).await.unwrap();

  let asset = report
    .emitted
    .iter()
    .find(|f| f.kind == FileKind::Asset)
    .expect("logo is emitted");
  assert!(asset.name.starts_with("logo."));
  assert!(asset.name.ends_with(".png"));
  assert_eq!(asset.name.len(), "logo.".len() + 20 + ".png".len());
  assert_eq!(asset.bytes, 10 * 1024);
  assert_eq!(fs::read(report.out_dir.join(&asset.name)).unwrap(), logo);

  assert!(script_of(&report).contains(&asset.name));
  assert!(matches!(
    report.warnings.as_slice(),
    [BuildWarning::AssetAboveInlineLimit { limit: 3072, .. }]
  ));
}

#[tokio::test]
async fn unresolved_reference_fails_the_build() {
  let temp = project(&[("src/index.js", b"import \"./missing.js\";\n")]);

  let err = build(&config(temp.path(), Mode::Production)).await.unwrap_err();

  match err {
    BuildError::Graph(GraphError::UnresolvedReference { reference, from }) => {
      assert_eq!(reference, "./missing.js");
      assert!(from.ends_with("src/index.js"));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn module_without_rule_fails_the_build() {
  let temp = project(&[
    ("src/index.js", b"import data from \"./data.xml\";\n"),
    ("src/data.xml", b"<data/>"),
  ]);

  let err = build(&config(temp.path(), Mode::Production)).await.unwrap_err();
  assert!(matches!(err, BuildError::NoMatchingRule { module } if module.ends_with("data.xml")));
}

#[tokio::test]
async fn production_extracts_stylesheet() {
  let temp = project(&[
    ("src/index.js", b"import \"./main.css\";\n"),
    ("src/main.css", b"h1 { color: red; }\n"),
  ]);

  let report = build(&config(temp.path(), Mode::Production)).await.unwrap();

  let css = &report.manifest.get("stylesheet").expect("stylesheet emitted")[0];
  assert!(css.starts_with("styles.") && css.ends_with(".css"));
  let text = fs::read_to_string(report.out_dir.join(css)).unwrap();
  assert!(text.contains("color"));

  let html = fs::read_to_string(report.out_dir.join("index.html")).unwrap();
  assert!(html.contains(&format!(r#"<link rel="stylesheet" href="{css}" />"#)));
}

#[tokio::test]
async fn development_uses_readable_names_and_node_env() {
  let temp = project(&[(
    "src/index.js",
    b"if (process.env.NODE_ENV === \"development\") { console.log(\"dev\"); }\n",
  )]);

  let report = build(&config(temp.path(), Mode::Development)).await.unwrap();

  assert_eq!(report.manifest.get("script"), Some(&["bundle.js".to_string()][..]));
  let script = script_of(&report);
  assert!(script.contains("\"development\" === \"development\""));
  assert!(!script.contains("process.env.NODE_ENV"));
}

#[tokio::test]
async fn builds_are_deterministic() {
  let temp = project(&[
    ("src/index.js", b"import a from \"./a.js\";\nimport b from \"./b.js\";\nconsole.log(a, b);\n"),
    ("src/a.js", b"export default \"a\";\n"),
    ("src/b.js", b"import a from \"./a.js\";\nexport default a + \"b\";\n"),
  ]);
  let config = config(temp.path(), Mode::Production);

  let first = build(&config).await.unwrap();
  let second = build(&config).await.unwrap();

  assert_eq!(first.output_hash, second.output_hash);
  assert_eq!(first.manifest, second.manifest);
  assert_eq!(
    first.emitted.iter().map(|f| &f.name).collect::<Vec<_>>(),
    second.emitted.iter().map(|f| &f.name).collect::<Vec<_>>()
  );
  assert_eq!(first.modules.len(), 3);
}

#[tokio::test]
async fn content_change_changes_bundle_name() {
  let temp = project(&[("src/index.js", b"console.log(1);\n")]);
  let config = config(temp.path(), Mode::Production);

  let before = build(&config).await.unwrap();
  fs::write(temp.path().join("src/index.js"), b"console.log(2);\n").unwrap();
  let after = build(&config).await.unwrap();

  assert_ne!(before.manifest.get("script"), after.manifest.get("script"));
  assert_ne!(before.output_hash, after.output_hash);
  // Clean output leaves only the latest bundle.
  assert_eq!(output_files(&after.out_dir).len(), 2);
}

#[tokio::test]
async fn multiline_template_literals_survive_bundling() {
  let temp = project(&[(
    "src/index.js",
    b"const s = `a\n  b\nc`;\nconsole.log(s);\n",
  )]);

  for mode in [Mode::Development, Mode::Production] {
    let report = build(&config(temp.path(), mode)).await.unwrap();
    let script = script_of(&report);
    assert!(script.contains("`a\n  b\nc`"), "{mode}: {script}");
  }
}

#[tokio::test]
async fn compact_imports_are_bundled() {
  let temp = project(&[
    ("src/index.js", b"import a from\"./a.js\";\nimport{b}from'./b.js';\nconsole.log(a, b);\n"),
    ("src/a.js", b"export default \"a\";\n"),
    ("src/b.js", b"export const b = \"b\";\n"),
  ]);

  let report = build(&config(temp.path(), Mode::Development)).await.unwrap();

  assert_eq!(report.modules.len(), 3);
  let script = script_of(&report);
  assert!(script.contains("__hashpack_require(\"./src/a.js\")"), "{script}");
  assert!(script.contains("__hashpack_require(\"./src/b.js\")"), "{script}");
}

#[tokio::test]
async fn commented_out_references_are_not_followed() {
  let temp = project(&[(
    "src/index.js",
    b"// const old = require('./old.js');\n/* import \"./gone.css\"; */\nconsole.log(1);\n",
  )]);

  let report = build(&config(temp.path(), Mode::Development)).await.unwrap();

  assert_eq!(report.modules.len(), 1);
  assert!(script_of(&report).contains("require('./old.js')"));
}

#[tokio::test]
async fn output_dir_over_the_project_is_rejected_before_cleaning() {
  let temp = project(&[("src/index.js", b"console.log(1);\n")]);
  let overrides = ConfigOverrides {
    mode: Some(Mode::Production),
    output_dir: Some(temp.path().to_path_buf()),
    ..Default::default()
  };

  let err = BuildConfig::from_raw(RawConfig::default(), temp.path(), &overrides).unwrap_err();

  assert!(matches!(err, ConfigError::OutputContainsSources { .. }), "{err}");
  assert!(temp.path().join("src/index.js").is_file());
}
