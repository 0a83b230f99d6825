//! Project configuration loading.
//!
//! Turns files on disk into a single raw document:
//! 1. **Loader** - a file, or a directory tree keyed by entry base name
//! 2. **Merge** - deep merge where `null` deletes a key
//! 3. **Root** - discovery of the project's root config entries
//!
//! ## Formats
//! - `.yaml` / `.yml` - YAML, decoded strictly
//! - `.json` - JSON
//!
//! Tool settings (defaults for the command line) live in [`settings`].

mod format;
mod loader;
mod merge;
mod root;
pub mod settings;

pub use format::{ConfigFormat, base_name};
pub use loader::{load, load_file};
pub use merge::{deep_merge, deep_merge_all};
pub use root::{DEFAULT_ROOT_NAMES, RootSource, load_root};
pub use settings::Settings;
