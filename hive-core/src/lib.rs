//! hive-core: restore, load and unload extension packages at runtime
//!
//! This crate provides the building blocks a host needs to run externally
//! sourced extensions without restarting:
//!
//! - **References** - [`PackageReference`] names a package source and its configuration
//! - **Lifecycle** - [`PackageController`] lists versions, restores, loads and unloads one package
//! - **Isolation** - [`LoadContext`] owns a loaded module, [`UnloadHandle`] observes its reclamation
//! - **Discovery** - [`scan_types`] picks the types that provide a [`Capability`]
//! - **Batches** - [`ExtensionHive`] loads many packages into one [`ExtensionRegistry`]
//! - **Storage** - [`ReferenceStore`] persists references through a [`ReferenceDatabase`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hive_core::{
//!     ExtensionHive, FileReferenceDatabase, HiveConfig, NoProgress, ReferenceStore,
//! };
//! use hive_extension_api::DescribeCapability;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> Result<(), hive_core::PackageError> {
//!     let config = HiveConfig::default();
//!     let environment = Arc::new(config.environment(None));
//!
//!     let store = ReferenceStore::new(
//!         Arc::new(FileReferenceDatabase::new(&config.paths.references_file)),
//!         Arc::clone(&environment),
//!     );
//!
//!     let mut hive = ExtensionHive::<DescribeCapability>::new(environment);
//!     let report = hive
//!         .load_packages(&store.get_all().await?, &NoProgress, &CancellationToken::new())
//!         .await?;
//!
//!     for descriptor in hive.get_extensions() {
//!         println!("{}", descriptor.full_name());
//!     }
//!     println!("{} package(s) failed", report.failed.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ReferenceStore ──get_all()──► ExtensionHive
//!                                  │ one per reference, built-in last
//!                                  ▼
//!                            PackageController ──restore──► cache_root/<provider>/<source>/<version>
//!                                  │ load
//!                                  ▼
//!                      Arc<LoadContext> ◄── RegisteredExtension (registry snapshot)
//! ```

pub mod builder;
pub mod config;
pub mod controller;
pub mod database;
pub mod environment;
pub mod error;
pub mod hive;
pub mod loader;
pub mod progress;
pub mod reference;
pub mod scanner;
pub mod store;

mod process;

pub use builder::{BuildRequest, CommandBuilder, PackageBuilder};
pub use config::{GitConfig, HiveConfig, PathsConfig};
pub use controller::{BUILTIN_VERSION, ControllerState, PackageController, strip_credentials};
pub use database::{FileReferenceDatabase, ReferenceDatabase};
pub use environment::PackageEnvironment;
pub use error::{ErrorKind, PackageError};
pub use hive::{
    BUILTIN_ID, ExtensionHive, ExtensionInstance, ExtensionRegistry, LoadFailure, LoadReport,
    RegisteredExtension,
};
pub use loader::{DylibLoader, LoadContext, LoadedModule, ModuleLoader, RegisterFn, UnloadHandle};
pub use progress::{NoProgress, ProgressSink};
pub use reference::{
    ENTRYPOINT_KEY, PATH_KEY, PackageReference, Provider, REPOSITORY_KEY, ReferenceMap, TAG_KEY,
    VERSION_KEY,
};
pub use scanner::scan_types;
pub use store::ReferenceStore;

pub use hive_extension_api::Capability;
