//! Services Analyzer: recursive roll-up of check results per service
//!
//! `analyze` walks a service's own non-stop edges depth-first and folds
//! every child's pass/fail tally into its parent, collecting the failing
//! leaf results on the way. A dependent service reached through a
//! `depends_on` edge is analyzed first and folded in; a result leaf
//! reachable both directly and through a dependency counts once.

use crate::builders::GraphBuilders;
use crate::graph::{EdgeKind, GraphError, NodeKey, NodeKind, ResultsGraph};
use crate::graphml::write_graphml;
use crate::ingest::ResultSource;
use netcam_core::{CheckResult, CheckStatus, Design, DesignLayout};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Write};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReport {
    pub name: String,
    pub status: CheckStatus,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Failing leaf results, in walk order.
    pub failed: Vec<CheckResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLink {
    pub from: String,
    pub to: String,
    pub stop: bool,
}

/// Services reachable from `root`, in breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTree {
    pub root: String,
    pub order: Vec<String>,
    pub links: Vec<ServiceLink>,
}

impl ServiceTree {
    pub fn children(&self, service: &str) -> impl Iterator<Item = &ServiceLink> + '_ {
        let service = service.to_string();
        self.links.iter().filter(move |l| l.from == service)
    }
}

/// Result leaves reached by one walk, each counted once however many
/// paths lead to it.
#[derive(Debug, Clone, Default)]
struct Tally {
    leaves: Vec<(NodeIndex, Leaf)>,
    seen: HashSet<NodeIndex>,
}

#[derive(Debug, Clone)]
struct Leaf {
    pass: usize,
    fail: usize,
    failed: Option<CheckResult>,
}

impl Tally {
    fn add(&mut self, idx: NodeIndex, leaf: Leaf) {
        if self.seen.insert(idx) {
            self.leaves.push((idx, leaf));
        }
    }

    fn fold(&mut self, other: Tally) {
        for (idx, leaf) in other.leaves {
            self.add(idx, leaf);
        }
    }

    fn pass(&self) -> usize {
        self.leaves.iter().map(|(_, l)| l.pass).sum()
    }

    fn fail(&self) -> usize {
        self.leaves.iter().map(|(_, l)| l.fail).sum()
    }

    fn failed(&self) -> Vec<CheckResult> {
        self.leaves.iter().filter_map(|(_, l)| l.failed.clone()).collect()
    }
}

#[derive(Debug)]
pub struct ServicesAnalyzer {
    design: Design,
    graph: ResultsGraph,
    reports: HashMap<String, ServiceReport>,
}

impl ServicesAnalyzer {
    /// Build the results graph for every service in `design`.
    pub fn build(design: Design, source: &dyn ResultSource, builders: &GraphBuilders) -> Result<Self, GraphError> {
        let mut graph = ResultsGraph::new();
        for service in &design.services {
            builders.get(&service.kind).build(&mut graph, &design, service, source)?;
        }
        info!(
            design = %design.name,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "results graph built"
        );
        Ok(Self {
            design,
            graph,
            reports: HashMap::new(),
        })
    }

    /// Build from result files under `layout` with the default builders.
    pub fn from_layout(design: Design, layout: &DesignLayout) -> Result<Self, GraphError> {
        Self::build(design, layout, &GraphBuilders::default())
    }

    pub fn graph(&self) -> &ResultsGraph {
        &self.graph
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    /// Last report produced for `service`.
    pub fn report(&self, service: &str) -> Option<&ServiceReport> {
        self.reports.get(service)
    }

    pub fn analyze(&mut self, service: &str) -> Result<ServiceReport, GraphError> {
        let mut memo = HashMap::new();
        let mut in_progress = HashSet::new();
        self.analyze_service(service, &mut memo, &mut in_progress)?;
        self.reports
            .get(service)
            .cloned()
            .ok_or_else(|| GraphError::UnknownService(service.to_string()))
    }

    /// Analyze every design service, in design order.
    pub fn analyze_all(&mut self) -> Result<Vec<ServiceReport>, GraphError> {
        let names: Vec<String> = self.design.services.iter().map(|s| s.name.clone()).collect();
        let mut memo = HashMap::new();
        let mut in_progress = HashSet::new();
        let mut reports = Vec::with_capacity(names.len());
        for name in &names {
            self.analyze_service(name, &mut memo, &mut in_progress)?;
            if let Some(report) = self.reports.get(name) {
                reports.push(report.clone());
            }
        }
        Ok(reports)
    }

    /// FAIL when any design service is FAIL as of the last analysis.
    pub fn design_status(&self) -> CheckStatus {
        let failed = self.design.services.iter().any(|s| {
            self.graph
                .node(&NodeKey::service(&s.name))
                .is_some_and(|n| n.status == CheckStatus::Fail)
        });
        if failed {
            CheckStatus::Fail
        } else {
            CheckStatus::Pass
        }
    }

    /// Services reachable from `service` through service edges, each
    /// service contributing only the edges it owns.
    pub fn service_graph(&self, service: &str) -> Result<ServiceTree, GraphError> {
        let root = self.service_index(service)?;
        let mut order = Vec::new();
        let mut links = Vec::new();
        let mut seen = HashSet::from([service.to_string()]);
        let mut queue = VecDeque::from([(service.to_string(), root)]);

        while let Some((name, idx)) = queue.pop_front() {
            for (child, edge) in self.graph.owned_edges(idx, &name) {
                if edge.kind != EdgeKind::Service {
                    continue;
                }
                let Some(NodeKey::Service { name: dependent }) = self.graph.weight(child).map(|n| &n.key) else {
                    continue;
                };
                links.push(ServiceLink {
                    from: name.clone(),
                    to: dependent.clone(),
                    stop: edge.stop,
                });
                if seen.insert(dependent.clone()) {
                    queue.push_back((dependent.clone(), child));
                }
            }
            order.push(name);
        }

        Ok(ServiceTree {
            root: service.to_string(),
            order,
            links,
        })
    }

    pub fn to_graphml<W: Write>(&self, out: W) -> io::Result<()> {
        write_graphml(&self.graph, out)
    }

    fn service_index(&self, service: &str) -> Result<NodeIndex, GraphError> {
        self.graph
            .index_of(&NodeKey::service(service))
            .map_err(|_| GraphError::UnknownService(service.to_string()))
    }

    fn analyze_service(
        &mut self,
        service: &str,
        memo: &mut HashMap<String, Tally>,
        in_progress: &mut HashSet<String>,
    ) -> Result<Tally, GraphError> {
        if let Some(tally) = memo.get(service) {
            return Ok(tally.clone());
        }
        let root = self.service_index(service)?;

        in_progress.insert(service.to_string());
        let mut visited = HashSet::from([root]);
        let tally = self.walk(root, service, &mut visited, memo, in_progress)?;
        in_progress.remove(service);

        let (pass, fail) = (tally.pass(), tally.fail());
        let status = if fail > 0 { CheckStatus::Fail } else { CheckStatus::Pass };
        if let Some(node) = self.graph.weight_mut(root) {
            node.pass_count = pass;
            node.fail_count = fail;
            node.status = status;
        }
        if let Some(design_service) = self.design.service_mut(service) {
            design_service.status = status;
        }
        debug!(service = %service, pass, fail, status = %status, "service analyzed");

        self.reports.insert(
            service.to_string(),
            ServiceReport {
                name: service.to_string(),
                status,
                pass_count: pass,
                fail_count: fail,
                failed: tally.failed(),
            },
        );
        memo.insert(service.to_string(), tally.clone());
        Ok(tally)
    }

    fn walk(
        &mut self,
        idx: NodeIndex,
        service: &str,
        visited: &mut HashSet<NodeIndex>,
        memo: &mut HashMap<String, Tally>,
        in_progress: &mut HashSet<String>,
    ) -> Result<Tally, GraphError> {
        let mut tally = Tally::default();

        for (child, edge) in self.graph.owned_edges(idx, service) {
            if edge.stop || !visited.insert(child) {
                continue;
            }
            let Some(node) = self.graph.weight(child) else {
                continue;
            };

            match node.kind() {
                NodeKind::Service => {
                    let NodeKey::Service { name } = node.key.clone() else {
                        continue;
                    };
                    if in_progress.contains(&name) {
                        warn!(service = %service, dependency = %name, "service dependency cycle, not folded");
                        continue;
                    }
                    tally.fold(self.analyze_service(&name, memo, in_progress)?);
                }
                NodeKind::Design => {
                    tally.fold(self.walk(child, service, visited, memo, in_progress)?);
                }
                NodeKind::Result => {
                    let leaf = Leaf {
                        pass: node.pass_count,
                        fail: node.fail_count,
                        failed: node.result.clone().filter(|_| node.status == CheckStatus::Fail),
                    };
                    let below = self.walk(child, service, visited, memo, in_progress)?;
                    tally.fold(below);
                    tally.add(child, leaf);
                }
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode};
    use crate::ingest::MemoryResults;
    use netcam_core::{Check, DesignService};
    use serde_json::json;

    fn analyzer_with(graph: ResultsGraph, services: &[&str]) -> ServicesAnalyzer {
        let mut design = Design::new("dc1");
        for name in services {
            design.services.push(DesignService::new(*name));
        }
        ServicesAnalyzer {
            design,
            graph,
            reports: HashMap::new(),
        }
    }

    fn failure(id: &str) -> CheckResult {
        CheckResult::failure("sw1", Check::new("interface", json!({"name": id}), json!({})), "down")
    }

    #[test]
    fn test_cycle_is_guarded() {
        let mut graph = ResultsGraph::new();
        graph.add_service("a");
        graph.add_service("b");
        let (a, b) = (NodeKey::service("a"), NodeKey::service("b"));
        graph.add_edge(&a, &b, GraphEdge::new(EdgeKind::Service, "a")).unwrap();
        graph.add_edge(&b, &a, GraphEdge::new(EdgeKind::Service, "b")).unwrap();
        graph.add_node(GraphNode::design("sw1", "sw1", "b"));
        graph.add_edge(&b, &NodeKey::design("sw1"), GraphEdge::new(EdgeKind::Design, "b")).unwrap();
        let (leaf, _) = graph.add_result("b", "interfaces", failure("Ethernet1"));
        graph.add_edge(&NodeKey::design("sw1"), &leaf, GraphEdge::new(EdgeKind::Result, "b")).unwrap();

        let mut analyzer = analyzer_with(graph, &["a", "b"]);
        let reports = analyzer.analyze_all().unwrap();

        assert_eq!(reports[0].fail_count, 1);
        assert_eq!(reports[1].fail_count, 1);
        assert_eq!(analyzer.design_status(), CheckStatus::Fail);
    }

    #[test]
    fn test_unknown_service() {
        let mut analyzer = analyzer_with(ResultsGraph::new(), &[]);
        let err = analyzer.analyze("nope").unwrap_err();
        assert!(matches!(err, GraphError::UnknownService(name) if name == "nope"));
    }

    #[test]
    fn test_design_status_pass_without_results() {
        let mut design = Design::new("dc1");
        design.services.push(DesignService::new("topology").with_collections(["interfaces"]));
        let mut analyzer = ServicesAnalyzer::build(design, &MemoryResults::new(), &GraphBuilders::new()).unwrap();

        let report = analyzer.analyze("topology").unwrap();
        assert_eq!((report.pass_count, report.fail_count), (0, 0));
        assert_eq!(analyzer.design_status(), CheckStatus::Pass);
    }
}
