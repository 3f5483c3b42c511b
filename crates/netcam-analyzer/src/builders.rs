//! Per-service-kind graph building
//!
//! A [`ServiceGraphBuilder`] lays one design service out in the results
//! graph. [`GraphBuilders`] picks the builder for a service by its `kind`,
//! falling back to [`DefaultBuilder`].

use crate::graph::{EdgeKind, GraphEdge, GraphError, GraphNode, NodeKey, ResultsGraph};
use crate::ingest::ResultSource;
use netcam_core::layout::DEVICE_TASK_RESULTS;
use netcam_core::{Design, DesignService};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub trait ServiceGraphBuilder: Send + Sync {
    fn build(
        &self,
        graph: &mut ResultsGraph,
        design: &Design,
        service: &DesignService,
        source: &dyn ResultSource,
    ) -> Result<(), GraphError>;
}

/// `service -> device -> result` for every collection of the service and
/// for the device's own setup or timeout failure, plus `service -> service`
/// for `depends_on` (rolled up) and `references` (display only).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBuilder;

impl ServiceGraphBuilder for DefaultBuilder {
    fn build(
        &self,
        graph: &mut ResultsGraph,
        design: &Design,
        service: &DesignService,
        source: &dyn ResultSource,
    ) -> Result<(), GraphError> {
        let name = service.name.as_str();
        let root = NodeKey::service(name);
        graph.add_service(name);

        for device in design.service_devices(service) {
            let device_key = NodeKey::design(&device.name);
            graph.add_node(GraphNode::design(&device.name, &device.name, name));
            graph.add_edge(&root, &device_key, GraphEdge::new(EdgeKind::Design, name))?;

            let collections = service
                .check_collections
                .iter()
                .map(String::as_str)
                .chain([DEVICE_TASK_RESULTS]);
            for collection in collections {
                let Some(results) = source.load(&device.name, collection) else {
                    debug!(service = %name, device = %device.name, collection = %collection, "no results");
                    continue;
                };
                for result in results {
                    let (key, _) = graph.add_result(name, collection, result);
                    graph.add_edge(&device_key, &key, GraphEdge::new(EdgeKind::Result, name))?;
                }
            }
        }

        link_services(graph, service)
    }
}

/// Add the service's own `depends_on` and `references` edges.
pub fn link_services(graph: &mut ResultsGraph, service: &DesignService) -> Result<(), GraphError> {
    let name = service.name.as_str();
    let root = NodeKey::service(name);

    for dependency in &service.depends_on {
        graph.add_service(dependency);
        graph.add_edge(&root, &NodeKey::service(dependency), GraphEdge::new(EdgeKind::Service, name))?;
    }
    for reference in &service.references {
        graph.add_service(reference);
        graph.add_edge(
            &root,
            &NodeKey::service(reference),
            GraphEdge::new(EdgeKind::Service, name).stopped(),
        )?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct GraphBuilders {
    builders: HashMap<String, Arc<dyn ServiceGraphBuilder>>,
    fallback: Arc<dyn ServiceGraphBuilder>,
}

impl Default for GraphBuilders {
    fn default() -> Self {
        Self {
            builders: HashMap::new(),
            fallback: Arc::new(DefaultBuilder),
        }
    }
}

impl GraphBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<B: ServiceGraphBuilder + 'static>(mut self, kind: impl Into<String>, builder: B) -> Self {
        self.builders.insert(kind.into(), Arc::new(builder));
        self
    }

    pub fn get(&self, kind: &str) -> &dyn ServiceGraphBuilder {
        self.builders
            .get(kind)
            .map(|b| b.as_ref())
            .unwrap_or_else(|| self.fallback.as_ref())
    }
}

impl fmt::Debug for GraphBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().collect();
        kinds.sort();
        f.debug_struct("GraphBuilders").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::ingest::MemoryResults;
    use netcam_core::{Check, CheckResult, Device};
    use serde_json::json;

    fn design() -> Design {
        let mut design = Design::new("dc1");
        design.devices.push(Device {
            name: "sw1".into(),
            os_name: "eos".into(),
            services: vec!["topology".into(), "vlans".into()],
        });
        design.services.push(DesignService::new("topology").with_collections(["interfaces"]));
        design
            .services
            .push(DesignService::new("vlans").with_collections(["vlans"]).depends_on("topology"));
        design
    }

    #[test]
    fn test_default_builder_layout() {
        let design = design();
        let check = Check::new("interface", json!({"name": "Ethernet1"}), json!({}));
        let source = MemoryResults::new().with("sw1", "interfaces", vec![CheckResult::failure("sw1", check, "down")]);

        let mut graph = ResultsGraph::new();
        let builders = GraphBuilders::new();
        for service in &design.services {
            builders.get(&service.kind).build(&mut graph, &design, service, &source).unwrap();
        }

        // 2 services, 1 device, 1 result
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.node(&NodeKey::design("sw1")).unwrap().kind(), NodeKind::Design);
        // topology->sw1, sw1->result, vlans->sw1, vlans->topology
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_device_failure_attached_to_every_service() {
        let design = design();
        let check = Check::new(DEVICE_TASK_RESULTS, json!({"device": "sw1", "phase": "setup"}), json!(null));
        let result = CheckResult::failure("sw1", check, "connection refused");
        let key = NodeKey::result(DEVICE_TASK_RESULTS, &result);
        let source = MemoryResults::new().with("sw1", DEVICE_TASK_RESULTS, vec![result]);

        let mut graph = ResultsGraph::new();
        for service in &design.services {
            DefaultBuilder.build(&mut graph, &design, service, &source).unwrap();
        }

        let failure = graph.node(&key).unwrap();
        assert_eq!(failure.fail_count, 1);
        // topology->sw1, vlans->sw1, vlans->topology, one result edge per service
        assert_eq!(graph.edge_count(), 5);
    }

    struct FlatBuilder;

    impl ServiceGraphBuilder for FlatBuilder {
        fn build(
            &self,
            graph: &mut ResultsGraph,
            _design: &Design,
            service: &DesignService,
            _source: &dyn ResultSource,
        ) -> Result<(), GraphError> {
            graph.add_service(&service.name);
            Ok(())
        }
    }

    #[test]
    fn test_builder_selected_by_kind() {
        let mut design = design();
        design.services[0].kind = "flat".into();
        let builders = GraphBuilders::new().with("flat", FlatBuilder);

        let mut graph = ResultsGraph::new();
        let source = MemoryResults::new();
        builders.get("flat").build(&mut graph, &design, &design.services[0], &source).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
