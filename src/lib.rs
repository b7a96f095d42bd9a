//! # kodegen_bundler_apple
//!
//! Build partials for Apple bundles: each partial takes the facts of one
//! target and returns the actions that produce a piece of the bundle.
//!
//! ## Partials
//!
//! - **Code signing** ([`codesign`]): decides which paths of a bundle are
//!   signed and assembles the signing helper's command lines
//! - **Archive processing** ([`archive`]): unpacks an unprocessed archive,
//!   runs a post-processor, signs and re-zips it
//! - **Debug symbols** ([`dsym`]): lays out per-architecture debug binaries
//!   as a `.dSYM` bundle and aggregates debug outputs across dependencies
//!
//! Planning is pure. Actions are run by a host, or by
//! [`action::LocalExecutor`] from the command line.
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_apple --device sign-command --rule ios_application --bundle-path Payload/App.app
//! kodegen_bundler_apple --dry-run process-archive --label App --rule ios_application \
//!     --input App.zip --output App.ipa
//! kodegen_bundler_apple dsym --bundle-name App --bundle-extension .app \
//!     --binary arm64=App_arm64 --out-dir out
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod action;
pub mod archive;
pub mod cli;
pub mod codesign;
pub mod config;
pub mod dsym;
pub mod error;
pub mod platform;
pub mod rule;
pub mod utils;

pub use archive::{ArchivePlan, ProcessArchiveRequest, post_process_and_sign_archive};
pub use config::BuildConfig;
pub use dsym::{DebugSymbolsOutputs, DebugSymbolsRequest, debug_symbols};
pub use error::{Error, Result};
pub use platform::{CompilationMode, Defines, Environment, PlatformPrerequisites, PlatformType};
pub use rule::{RuleDescriptor, RuleType};
