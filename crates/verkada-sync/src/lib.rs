//! Verkada camera inventory and video lease sync.
//!
//! A run pages through the vendor's cameras and the registry's leases, provisions a live
//! stream lease for every camera the footage grant covers, and emits one GeoJSON point per
//! camera with the stream URL attached where available.

pub mod batcher;
pub mod config;
pub mod context;
pub mod eligibility;
pub mod error;
pub mod lease_index;
pub mod pagination;
pub mod reconciler;
pub mod registry;
pub mod sink;
pub mod sync;
pub mod synthesizer;
pub mod vendor;

pub use config::{ConnectorConfig, Region};
pub use error::{LeaseError, SyncError};
pub use registry::{HttpLeaseRegistry, LeaseRegistry};
pub use sink::{FeatureSink, HttpLayerSink, StdoutSink};
pub use sync::{CameraOutcome, Connector, OutcomeStatus, RunSummary, SyncOptions, SyncReport};
pub use vendor::{HttpVendorClient, VendorApi};
