//! Netcam Core: checks, measurements and reconciliation
//!
//! A [`Check`] states one fact a network design expects of a device. A
//! driver observes the device and reports a [`Measurement`]; reconciliation
//! compares the two field by field (or as an exhaustive set) and yields a
//! classified [`CheckResult`] with a full audit log.
//!
//! ```
//! use netcam_core::{measure, Check, CheckStatus, MeasureOptions, Measurement};
//! use serde_json::json;
//!
//! let check = Check::new("interface", json!({"name": "Ethernet1"}), json!({"speed": 1000}));
//! let observed = Measurement::new(["speed"]).with("speed", 100);
//!
//! let result = measure("sw1", check, Some(observed), &MeasureOptions::new());
//! assert_eq!(result.status(), CheckStatus::Fail);
//! assert_eq!(result.field(), Some("speed"));
//! ```

pub mod check;
pub mod check_types;
pub mod config;
pub mod context;
pub mod design;
pub mod error;
pub mod exclusive;
pub mod layout;
pub mod measure;
pub mod measurement;
pub mod observation;
pub mod result;
pub mod status;
pub mod telemetry;

pub use check::{Check, CheckCollection};
pub use config::{LogConfig, VerifyConfig};
pub use context::VerifyContext;
pub use design::{Design, DesignService, Device};
pub use error::NetcamError;
pub use exclusive::{measure_exclusive, natural_order, ExclusiveOptions};
pub use layout::DesignLayout;
pub use measure::{measure, MeasureOptions, MismatchPolicy};
pub use measurement::{Measurement, MeasurementSchema};
pub use observation::{reconcile_collection, tally, Observation};
pub use result::{filter_at_least, sort_results, CheckResult, LogEntry, ResultLogs};
pub use status::{CheckStatus, StatusCounts, StatusSet};

/// Engine version recorded in device summaries
pub const NETCAM_VERSION: &str = env!("CARGO_PKG_VERSION");
