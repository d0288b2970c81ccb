//! `drivercore-recon`: reconciles vendor device-support rows against the
//! DriverCore catalog.
//!
//! Pure engine crate: receives raw rows and a [`CatalogClient`], returns
//! per-row outcomes. No CLI, file or HTTP dependencies.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod merge;
pub mod model;
pub mod release;
pub mod summary;
pub mod synth;

pub use client::CatalogClient;
pub use config::RunConfig;
pub use engine::{run, MergeEngine};
pub use error::{CatalogError, ConfigError, IngestError};
pub use identity::normalize;
pub use merge::decide;
pub use model::{CatalogEntity, Lookup, RawRow, RowOutcome, RunReport};
pub use release::Release;
pub use synth::{synthesize, SynthesisContext};
