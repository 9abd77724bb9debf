//! Module graph construction.
//!
//! Starting from the entry module, the builder reads each module, extracts its
//! references, and resolves them to absolute paths. Discovery runs in waves:
//! every module found in one wave is loaded concurrently in the next, bounded
//! by a semaphore. The coordinating task owns the visited set, so a module
//! reached from two parents in the same wave is claimed and loaded exactly once.
//!
//! Reference cycles are stored as-is; the visited set stops traversal.

pub mod references;
pub mod resolve;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ResolveConfig;
use crate::util::text::strip_bom;

pub use references::{ReferenceExtractor, ScriptReferences, extractor_for};
pub use resolve::resolve;

/// Errors raised while building the module graph.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("entry module not found: {}", path.display())]
  EntryNotFound { path: PathBuf },

  #[error("cannot resolve '{reference}' from {}", from.display())]
  UnresolvedReference { from: PathBuf, reference: String },

  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("module loader stopped before the graph was complete")]
  Cancelled,

  #[error("module loader panicked: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Project-relative module identifier, e.g. `./src/index.js`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
  /// Id for `path`; paths outside `root` keep their absolute form.
  pub fn new(path: &Path, root: &Path) -> Self {
    match path.strip_prefix(root) {
      Ok(relative) => Self(format!("./{}", relative.to_string_lossy().replace('\\', "/"))),
      Err(_) => Self(path.to_string_lossy().replace('\\', "/")),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// A resolved source or asset file.
#[derive(Debug, Clone)]
pub struct Module {
  /// Absolute path; the module's identity.
  pub path: PathBuf,
  pub id: ModuleId,
  pub raw: Vec<u8>,
  /// Reference strings in declaration order.
  pub references: Vec<String>,
  /// Each reference mapped to the module it resolved to.
  pub resolved: BTreeMap<String, PathBuf>,
}

impl Module {
  /// Resolved dependencies in declaration order, without duplicates.
  pub fn dependencies(&self) -> Vec<&Path> {
    let mut seen = HashSet::new();
    self
      .references
      .iter()
      .filter_map(|r| self.resolved.get(r))
      .filter(|p| seen.insert(p.as_path()))
      .map(PathBuf::as_path)
      .collect()
  }
}

/// Every module reachable from the entry, with its reference edges.
#[derive(Debug)]
pub struct ModuleGraph {
  entry: PathBuf,
  modules: BTreeMap<PathBuf, Module>,
  graph: DiGraph<PathBuf, String>,
  nodes: HashMap<PathBuf, NodeIndex>,
}

impl ModuleGraph {
  pub fn entry(&self) -> &Module {
    // The entry is inserted before any other module and never removed.
    &self.modules[&self.entry]
  }

  pub fn get(&self, path: &Path) -> Option<&Module> {
    self.modules.get(path)
  }

  /// Modules ordered by path.
  pub fn modules(&self) -> impl Iterator<Item = &Module> {
    self.modules.values()
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Modules that reference `path`.
  pub fn dependents(&self, path: &Path) -> Vec<&Path> {
    let Some(&node) = self.nodes.get(path) else {
      return Vec::new();
    };
    let mut dependents: Vec<&Path> = self
      .graph
      .neighbors_directed(node, Direction::Incoming)
      .map(|n| self.graph[n].as_path())
      .collect();
    dependents.sort();
    dependents.dedup();
    dependents
  }

  pub fn has_cycles(&self) -> bool {
    is_cyclic_directed(&self.graph)
  }

  fn from_modules(entry: PathBuf, modules: BTreeMap<PathBuf, Module>) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for path in modules.keys() {
      nodes.insert(path.clone(), graph.add_node(path.clone()));
    }
    for module in modules.values() {
      let from = nodes[&module.path];
      for reference in &module.references {
        if let Some(to) = module.resolved.get(reference).and_then(|p| nodes.get(p)) {
          graph.add_edge(from, *to, reference.clone());
        }
      }
    }

    Self {
      entry,
      modules,
      graph,
      nodes,
    }
  }
}

/// Inputs to graph construction.
#[derive(Debug, Clone)]
pub struct GraphOptions {
  pub root: PathBuf,
  pub resolve: ResolveConfig,
  pub parallelism: usize,
}

/// Discover every module reachable from `entry`.
pub async fn build_graph(entry: &Path, options: &GraphOptions) -> Result<ModuleGraph, GraphError> {
  let entry = dunce::canonicalize(entry).map_err(|_| GraphError::EntryNotFound {
    path: entry.to_path_buf(),
  })?;
  if !entry.is_file() {
    return Err(GraphError::EntryNotFound { path: entry });
  }

  info!(entry = %entry.display(), "building module graph");

  let options = Arc::new(options.clone());
  let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));
  let mut modules: BTreeMap<PathBuf, Module> = BTreeMap::new();
  let mut claimed: HashSet<PathBuf> = HashSet::from([entry.clone()]);
  let mut frontier = vec![entry.clone()];
  let mut wave = 0usize;

  while !frontier.is_empty() {
    debug!(wave, modules = frontier.len(), "loading wave");
    let mut join_set = JoinSet::new();

    for path in frontier.drain(..) {
      let options = options.clone();
      let semaphore = semaphore.clone();
      join_set.spawn(async move {
        let _permit = semaphore.acquire_owned().await.map_err(|_| GraphError::Cancelled)?;
        load_module(path, &options).await
      });
    }

    let mut next = Vec::new();
    while let Some(joined) = join_set.join_next().await {
      let module = joined??;
      for dependency in module.dependencies() {
        if claimed.insert(dependency.to_path_buf()) {
          next.push(dependency.to_path_buf());
        }
      }
      modules.insert(module.path.clone(), module);
    }

    // Completion order is nondeterministic; keep waves stable for logging.
    next.sort();
    frontier = next;
    wave += 1;
  }

  let graph = ModuleGraph::from_modules(entry, modules);
  if graph.has_cycles() {
    warn!("module graph contains reference cycles");
  }
  info!(modules = graph.len(), waves = wave, "module graph complete");
  Ok(graph)
}

async fn load_module(path: PathBuf, options: &GraphOptions) -> Result<Module, GraphError> {
  let raw = tokio::fs::read(&path).await.map_err(|source| GraphError::Io {
    path: path.clone(),
    source,
  })?;

  let references = match extractor_for(&path) {
    Some(extractor) => extractor.extract(strip_bom(&String::from_utf8_lossy(&raw))),
    None => Vec::new(),
  };

  let mut resolved = BTreeMap::new();
  for reference in &references {
    let target = resolve(reference, &path, &options.root, &options.resolve).await?;
    resolved.insert(reference.clone(), target);
  }

  debug!(module = %path.display(), references = references.len(), bytes = raw.len(), "loaded module");

  Ok(Module {
    id: ModuleId::new(&path, &options.root),
    path,
    raw,
    references,
    resolved,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn project(files: &[(&str, &str)]) -> (TempDir, PathBuf, GraphOptions) {
    let dir = TempDir::new().unwrap();
    let root = dunce::canonicalize(dir.path()).unwrap();
    for (name, content) in files {
      let path = root.join(name);
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(path, content).unwrap();
    }
    let options = GraphOptions {
      root: root.clone(),
      resolve: ResolveConfig {
        extensions: vec![".js".to_string()],
        index_files: vec!["index.js".to_string()],
        modules: vec![root.join("node_modules")],
      },
      parallelism: 4,
    };
    (dir, root, options)
  }

  #[tokio::test]
  async fn discovers_transitive_dependencies() {
    let (_dir, root, options) = project(&[
      ("src/index.js", "import a from './a';\nimport logo from './logo.png';\n"),
      ("src/a.js", "import b from './b.js';\n"),
      ("src/b.js", "export default 1;\n"),
      ("src/logo.png", "\u{89}PNG"),
    ]);

    let graph = build_graph(&root.join("src/index.js"), &options).await.unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.entry().id.as_str(), "./src/index.js");
    assert_eq!(
      graph.entry().dependencies(),
      vec![root.join("src/a.js").as_path(), root.join("src/logo.png").as_path()]
    );
    assert!(graph.get(&root.join("src/logo.png")).unwrap().references.is_empty());
  }

  #[tokio::test]
  async fn shared_dependency_is_loaded_once() {
    let (_dir, root, options) = project(&[
      ("src/index.js", "import './a.js';\nimport './b.js';\n"),
      ("src/a.js", "import './shared.js';\n"),
      ("src/b.js", "import './shared.js';\n"),
      ("src/shared.js", "export const x = 1;\n"),
    ]);

    let graph = build_graph(&root.join("src/index.js"), &options).await.unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(
      graph.dependents(&root.join("src/shared.js")),
      vec![root.join("src/a.js").as_path(), root.join("src/b.js").as_path()]
    );
  }

  #[tokio::test]
  async fn cycles_terminate() {
    let (_dir, root, options) = project(&[
      ("src/index.js", "import './a.js';\n"),
      ("src/a.js", "import './index.js';\n"),
    ]);

    let graph = build_graph(&root.join("src/index.js"), &options).await.unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph.has_cycles());
  }

  #[tokio::test]
  async fn unresolved_reference_fails_the_graph() {
    let (_dir, root, options) = project(&[("src/index.js", "import './missing.js';\n")]);

    let err = build_graph(&root.join("src/index.js"), &options).await.unwrap_err();
    assert!(matches!(err, GraphError::UnresolvedReference { reference, .. } if reference == "./missing.js"));
  }

  #[tokio::test]
  async fn missing_entry_is_reported() {
    let (_dir, root, options) = project(&[]);
    let err = build_graph(&root.join("src/index.js"), &options).await.unwrap_err();
    assert!(matches!(err, GraphError::EntryNotFound { .. }));
  }

  #[test]
  fn module_id_is_project_relative() {
    let id = ModuleId::new(Path::new("/app/src/index.js"), Path::new("/app"));
    assert_eq!(id.as_str(), "./src/index.js");
    let outside = ModuleId::new(Path::new("/lib/x.js"), Path::new("/app"));
    assert_eq!(outside.as_str(), "/lib/x.js");
  }
}
