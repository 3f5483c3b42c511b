//! Results graph roll-up, traversal and export.
//!
//! ```text
//! results/<collection>.json → ResultSource → ResultsGraph
//!     ↓
//! ServicesAnalyzer::analyze → pass/fail counts + failed leaves
//! ```

use netcam_analyzer::{
    EdgeKind, GraphBuilders, GraphEdge, GraphNode, MemoryResults, NodeKey, ResultsGraph,
    ServicesAnalyzer,
};
use netcam_core::{
    measure, Check, CheckResult, CheckStatus, Design, DesignLayout, DesignService, Device,
    MeasureOptions, Measurement,
};
use serde_json::json;

fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = std::path::Path::new(&manifest_dir).parent().unwrap().parent().unwrap();
    workspace_root.join("testing/fixtures").join(name)
}

fn campus() -> Design {
    let text = std::fs::read_to_string(fixture_path("designs/campus.yaml")).unwrap();
    Design::from_yaml(&text).unwrap()
}

fn interface(device: &str, name: &str, measured_speed: u64) -> CheckResult {
    let check = Check::new("interface", json!({"name": name}), json!({"speed": 1000}));
    let measurement = Measurement::new(["speed"]).with("speed", measured_speed);
    measure(device, check, Some(measurement), &MeasureOptions::new())
}

fn platform(device: &str) -> CheckResult {
    let check = Check::new("device", json!({"name": device}), json!({"product_model": "DCS-7050"}));
    let measurement = Measurement::new(["product_model"]).with("product_model", "DCS-7050");
    measure(device, check, Some(measurement), &MeasureOptions::new())
}

fn single_service(name: &str, collections: &[&str]) -> Design {
    let mut design = Design::new("dc1");
    design.devices.push(Device {
        name: "sw1".into(),
        os_name: "eos".into(),
        services: vec![name.to_string()],
    });
    design
        .services
        .push(DesignService::new(name).with_collections(collections.iter().copied()));
    design
}

// =============================================================================
// Node registration
// =============================================================================

#[test]
fn test_add_node_twice() {
    let mut graph = ResultsGraph::new();
    let result = interface("sw1", "Ethernet1", 1000);

    let first = graph.add_node(GraphNode::result("topology", "interfaces", result.clone()));
    let second = graph.add_node(GraphNode::result("topology", "interfaces", result.clone()));

    assert_eq!((first, second), (true, false));
    assert_eq!(graph.node_count(), 1);
    let node = graph.node(&NodeKey::result("interfaces", &result)).unwrap();
    assert_eq!((node.pass_count, node.fail_count), (1, 0));
}

// =============================================================================
// Roll-up
// =============================================================================

#[test]
fn test_three_results_one_fail() {
    let design = single_service("topology", &["interfaces"]);
    let source = MemoryResults::new().with(
        "sw1",
        "interfaces",
        vec![
            interface("sw1", "Ethernet1", 1000),
            interface("sw1", "Ethernet2", 100),
            interface("sw1", "Ethernet3", 1000),
        ],
    );
    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();

    let report = analyzer.analyze("topology").unwrap();

    assert_eq!(report.pass_count, 2);
    assert_eq!(report.fail_count, 1);
    assert_eq!(report.status, CheckStatus::Fail);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].check_id(), "Ethernet2");
    assert_eq!(report.failed[0].field(), Some("speed"));

    let node = analyzer.graph().node(&NodeKey::service("topology")).unwrap();
    assert_eq!(node.status, CheckStatus::Fail);
    assert_eq!((node.pass_count, node.fail_count), (2, 1));
    assert_eq!(analyzer.design().service("topology").unwrap().status, CheckStatus::Fail);
}

#[test]
fn test_analysis_is_repeatable() {
    let design = single_service("topology", &["interfaces"]);
    let source = MemoryResults::new().with(
        "sw1",
        "interfaces",
        vec![interface("sw1", "Ethernet1", 1000), interface("sw1", "Ethernet2", 100)],
    );
    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();

    let first = analyzer.analyze("topology").unwrap();
    let second = analyzer.analyze("topology").unwrap();
    assert_eq!(first, second);
    assert_eq!(second.pass_count + second.fail_count, 2);
}

#[test]
fn test_stop_edge_excludes_subtree() {
    let mut graph = ResultsGraph::new();
    graph.add_service("parent");
    graph.add_node(GraphNode::design("healthy", "healthy", "parent"));
    graph.add_node(GraphNode::design("broken", "broken", "parent"));

    let parent = NodeKey::service("parent");
    let healthy = NodeKey::design("healthy");
    let broken = NodeKey::design("broken");
    graph.add_edge(&parent, &healthy, GraphEdge::new(EdgeKind::Design, "parent")).unwrap();
    graph
        .add_edge(&parent, &broken, GraphEdge::new(EdgeKind::Design, "parent").stopped())
        .unwrap();

    let (ok, _) = graph.add_result("parent", "interfaces", interface("sw1", "Ethernet1", 1000));
    let (bad, _) = graph.add_result("parent", "interfaces", interface("sw1", "Ethernet2", 100));
    graph.add_edge(&healthy, &ok, GraphEdge::new(EdgeKind::Result, "parent")).unwrap();
    graph.add_edge(&broken, &bad, GraphEdge::new(EdgeKind::Result, "parent")).unwrap();

    let mut design = Design::new("dc1");
    design.services.push(DesignService::new("parent"));
    let mut analyzer = analyzer_over(design, graph);

    let report = analyzer.analyze("parent").unwrap();
    assert_eq!(report.fail_count, 0);
    assert_eq!(report.pass_count, 1);
    assert!(report.failed.is_empty());
    assert_eq!(report.status, CheckStatus::Pass);
}

/// Build through a custom builder that installs a prepared graph.
fn analyzer_over(design: Design, prepared: ResultsGraph) -> ServicesAnalyzer {
    use netcam_analyzer::{GraphError, ResultSource, ServiceGraphBuilder};

    struct Prepared(ResultsGraph);

    impl ServiceGraphBuilder for Prepared {
        fn build(
            &self,
            graph: &mut ResultsGraph,
            _design: &Design,
            _service: &DesignService,
            _source: &dyn ResultSource,
        ) -> Result<(), GraphError> {
            *graph = self.0.clone();
            Ok(())
        }
    }

    let builders = GraphBuilders::new().with("default", Prepared(prepared));
    ServicesAnalyzer::build(design, &MemoryResults::new(), &builders).unwrap()
}

#[test]
fn test_shared_device_node_keeps_services_apart() {
    let mut design = single_service("topology", &["interfaces"]);
    design.devices[0].services.push("vlans".into());
    design.services.push(DesignService::new("vlans").with_collections(["vlans"]));

    let vlan = Check::new("vlan", json!({"vlan_id": 10}), json!({"name": "users"}));
    let vlan = measure(
        "sw1",
        vlan,
        Some(Measurement::new(["name"]).with("name", "USERS")),
        &MeasureOptions::new(),
    );
    let source = MemoryResults::new()
        .with("sw1", "interfaces", vec![interface("sw1", "Ethernet1", 1000)])
        .with("sw1", "vlans", vec![vlan]);

    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();
    let reports = analyzer.analyze_all().unwrap();

    assert_eq!(reports[0].name, "topology");
    assert_eq!((reports[0].pass_count, reports[0].fail_count), (1, 0));
    assert_eq!(reports[1].name, "vlans");
    assert_eq!((reports[1].pass_count, reports[1].fail_count), (0, 1));
    // one design node shared by both services
    assert!(analyzer.graph().contains(&NodeKey::design("sw1")));
    assert_eq!(analyzer.design_status(), CheckStatus::Fail);
}

#[test]
fn test_same_check_in_two_collections_stays_apart() {
    let mut design = single_service("uplinks", &["interfaces"]);
    design.devices[0].services.push("mgmt".into());
    design.services.push(DesignService::new("mgmt").with_collections(["mgmt-interfaces"]));
    let source = MemoryResults::new()
        .with("sw1", "interfaces", vec![interface("sw1", "Ethernet1", 1000)])
        .with("sw1", "mgmt-interfaces", vec![interface("sw1", "Ethernet1", 100)]);

    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();

    let mgmt = analyzer.analyze("mgmt").unwrap();
    assert_eq!((mgmt.pass_count, mgmt.fail_count), (0, 1));
    assert_eq!(mgmt.status, CheckStatus::Fail);
    assert_eq!(mgmt.failed[0].check_id(), "Ethernet1");

    let uplinks = analyzer.analyze("uplinks").unwrap();
    assert_eq!((uplinks.pass_count, uplinks.fail_count), (1, 0));
    // two services, one device, two results
    assert_eq!(analyzer.graph().node_count(), 5);
}

#[test]
fn test_result_reached_twice_counts_once() {
    let mut design = single_service("topology", &["interfaces"]);
    design.devices[0].services.push("vlans".into());
    design
        .services
        .push(DesignService::new("vlans").with_collections(["interfaces"]).depends_on("topology"));
    let source = MemoryResults::new().with(
        "sw1",
        "interfaces",
        vec![interface("sw1", "Ethernet1", 1000), interface("sw1", "Ethernet2", 100)],
    );

    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();
    let vlans = analyzer.analyze("vlans").unwrap();

    assert_eq!((vlans.pass_count, vlans.fail_count), (1, 1));
    assert_eq!(vlans.failed.len(), 1);
}

// =============================================================================
// Service traversal
// =============================================================================

#[test]
fn test_dependency_rolls_up_reference_does_not() {
    let mut design = single_service("topology", &["interfaces"]);
    design
        .services
        .push(DesignService::new("vlans").depends_on("topology"));
    design
        .services
        .push(DesignService::new("dashboard").references("topology"));
    let source = MemoryResults::new().with("sw1", "interfaces", vec![interface("sw1", "Ethernet2", 100)]);

    let mut analyzer = ServicesAnalyzer::build(design, &source, &GraphBuilders::new()).unwrap();

    let vlans = analyzer.analyze("vlans").unwrap();
    assert_eq!(vlans.fail_count, 1);
    assert_eq!(vlans.failed[0].check_id(), "Ethernet2");

    let dashboard = analyzer.analyze("dashboard").unwrap();
    assert_eq!(dashboard.fail_count, 0);
    assert_eq!(dashboard.status, CheckStatus::Pass);
}

#[test]
fn test_service_graph_closure() {
    let mut design = Design::new("dc1");
    design.services.push(DesignService::new("fabric").depends_on("bgp").references("mgmt"));
    design.services.push(DesignService::new("bgp").depends_on("topology"));
    design.services.push(DesignService::new("topology"));
    design.services.push(DesignService::new("mgmt"));
    design.services.push(DesignService::new("unrelated"));

    let analyzer = ServicesAnalyzer::build(design, &MemoryResults::new(), &GraphBuilders::new()).unwrap();
    let tree = analyzer.service_graph("fabric").unwrap();

    assert_eq!(tree.order, vec!["fabric", "bgp", "mgmt", "topology"]);
    assert!(!tree.order.contains(&"unrelated".to_string()));
    let fabric: Vec<_> = tree.children("fabric").map(|l| (l.to.as_str(), l.stop)).collect();
    assert_eq!(fabric, vec![("bgp", false), ("mgmt", true)]);
    assert_eq!(tree.children("bgp").count(), 1);
}

// =============================================================================
// Ingestion from disk
// =============================================================================

#[test]
fn test_missing_and_malformed_files_are_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let design = single_service("topology", &["device", "interfaces", "lldp"]);
    let layout = DesignLayout::new(dir.path(), &design.name);

    layout.save_results("sw1", "device", &[platform("sw1")]).unwrap();
    let broken = layout.results_path("sw1", "interfaces");
    std::fs::create_dir_all(broken.parent().unwrap()).unwrap();
    std::fs::write(&broken, b"{ not json").unwrap();

    let mut analyzer = ServicesAnalyzer::from_layout(design, &layout).unwrap();
    let report = analyzer.analyze("topology").unwrap();

    assert_eq!(report.pass_count, 1);
    assert_eq!(report.fail_count, 0);
}

#[test]
fn test_end_to_end_from_result_files() {
    let dir = tempfile::tempdir().unwrap();
    let design = campus();
    let layout = DesignLayout::new(dir.path(), &design.name);

    layout.save_results("sw1", "device", &[platform("sw1")]).unwrap();
    layout
        .save_results(
            "sw1",
            "interfaces",
            &[interface("sw1", "Ethernet1", 1000), interface("sw1", "Ethernet2", 100)],
        )
        .unwrap();

    let mut analyzer = ServicesAnalyzer::from_layout(design, &layout).unwrap();
    let reports = analyzer.analyze_all().unwrap();

    let topology = &reports[0];
    assert_eq!(topology.name, "topology");
    assert_eq!((topology.pass_count, topology.fail_count), (2, 1));
    assert_eq!(topology.failed[0].device(), "sw1");

    // vlans has no results of its own and depends on topology
    let vlans = &reports[1];
    assert_eq!((vlans.pass_count, vlans.fail_count), (2, 1));
    assert_eq!(vlans.status, CheckStatus::Fail);

    let mut xml = Vec::new();
    analyzer.to_graphml(&mut xml).unwrap();
    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains("<graphml"));
    assert!(xml.contains(">interface Ethernet2</data>"));
    assert!(xml.contains(r#"<data key="e_stop">false</data>"#));
}
