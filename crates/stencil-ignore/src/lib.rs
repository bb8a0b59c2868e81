//! Layered ignore rules for template trees.
//!
//! `stencil-ignore` decides which files under a directory are eligible for
//! rendering. Every directory may carry a `.templateignore` file in gitignore
//! syntax; the rules of all relevant files, plus any patterns the caller
//! passes explicitly, are composed into one [`PatternSet`].
//!
//! # Priority
//!
//! A [`PatternSet`] is an ordered list and order is priority: the last
//! pattern that matches a path decides, including negated (`!`) patterns.
//! The collector appends, in order:
//!
//! 1. ignore files of the ancestors of the scope directory (root first)
//! 2. ignore files of the scope subtree (parents before children)
//! 3. explicit patterns
//!
//! so nested rules outrank their ancestors and explicit patterns outrank
//! everything read from disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use stencil_ignore::{eligible_files, PatternCollector};
//!
//! let patterns = PatternCollector::new("./site")
//!     .subdir("templates")
//!     .exclude("*.log")
//!     .collect()?;
//!
//! for file in eligible_files("./site".as_ref(), Some("templates"), &patterns)? {
//!     println!("{}", file.display());
//! }
//! ```

mod collector;
mod error;
mod pattern;
mod walk;

pub use collector::{read_ignore_file, PatternCollector, IGNORE_FILE_NAME};
pub use error::IgnoreError;
pub use pattern::{Match, Pattern, PatternSet};
pub use walk::eligible_files;
