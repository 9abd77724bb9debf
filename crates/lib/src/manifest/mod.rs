//! Emitted files and the output manifest.
//!
//! Every file a build writes is an [`EmittedFile`] whose name is derived from its
//! bytes. The [`Manifest`] maps logical entry-point slots (`script`,
//! `stylesheet`) to those names and is rebuilt from scratch on every build.

mod types;

pub use types::*;
