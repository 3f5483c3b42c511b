//! Netcam Analyzer: the results graph
//!
//! After a verification run, every persisted result is loaded into one
//! directed graph of service, design and result nodes. The
//! [`ServicesAnalyzer`] rolls pass/fail counts up to each service and keeps
//! the failing leaf checks, so a FAIL at the service level always comes
//! with its root causes.
//!
//! ```
//! use netcam_analyzer::{GraphBuilders, MemoryResults, ServicesAnalyzer};
//! use netcam_core::{Design, DesignService};
//!
//! let mut design = Design::new("dc1");
//! design.services.push(DesignService::new("topology").with_collections(["interfaces"]));
//!
//! let mut analyzer = ServicesAnalyzer::build(design, &MemoryResults::new(), &GraphBuilders::new()).unwrap();
//! let report = analyzer.analyze("topology").unwrap();
//! assert_eq!(report.fail_count, 0);
//! ```

pub mod analyzer;
pub mod builders;
pub mod graph;
pub mod graphml;
pub mod ingest;

pub use analyzer::{ServiceLink, ServiceReport, ServiceTree, ServicesAnalyzer};
pub use builders::{DefaultBuilder, GraphBuilders, ServiceGraphBuilder};
pub use graph::{EdgeKind, GraphEdge, GraphError, GraphNode, NodeKey, NodeKind, ResultsGraph};
pub use graphml::write_graphml;
pub use ingest::{MemoryResults, ResultSource};
