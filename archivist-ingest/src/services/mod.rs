//! Pipeline components
//!
//! Leaves first: structure validation, identity assignment, workgroup
//! preprocessing, record normalization, atomic merge, and the driver that
//! sequences them. The downloader is the transport seam.

pub mod downloader;
pub mod driver;
pub mod identity;
pub mod merge;
pub mod normalizer;
pub mod structure_validator;
pub mod workgroups;

pub use downloader::{FetchError, Fetched, Fetcher, HttpFetcher};
pub use driver::{DriverOptions, DriverState, MultiSourceDriver};
pub use merge::{MergeOrchestrator, MergeOutcome};
pub use normalizer::normalize;
pub use structure_validator::{SampleStrategy, StructureReport};
pub use workgroups::WorkgroupAccumulator;
