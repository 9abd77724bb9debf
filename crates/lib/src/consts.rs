//! Crate-wide constants.

/// Length of the hex digest embedded in content-addressed filenames.
pub const CONTENT_HASH_LEN: usize = 20;

/// Default inline threshold for `asset` modules (3 KiB).
pub const DEFAULT_INLINE_LIMIT: u64 = 3 * 1024;

/// Assets above this size get a performance hint in the build report (244 KiB).
pub const ASSET_SIZE_HINT: u64 = 244 * 1024;

/// Config file looked up when `--config` is not given.
pub const CONFIG_FILENAME: &str = "hashpack.toml";

/// Environment variable selecting the build mode.
pub const MODE_ENV_VAR: &str = "HASHPACK_MODE";

/// Extensions tried, in order, when a reference has no exact match.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".mjs", ".cjs", ".json"];

/// File names tried, in order, when a reference resolves to a directory.
pub const DEFAULT_INDEX_FILES: &[&str] = &["index.js", "index.mjs"];

/// Extensions whose content is scanned for `import`/`require` references.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

/// Manifest slot for the main script bundle.
pub const SLOT_SCRIPT: &str = "script";

/// Manifest slot for the extracted stylesheet.
pub const SLOT_STYLESHEET: &str = "stylesheet";

/// Marker placed at the top of generated bundles.
pub const BUNDLE_BANNER: &str = "/* hashpack bundle */";
