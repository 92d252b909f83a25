//! End-to-end join scenarios driven through the coordinator.

use ringsim_simulation::NetworkConfig;
use ringsim_simulator::{
    Contact, InvariantChecker, JoinMetrics, RingCoordinator, ScenarioBuilder, SimulatorConfig,
};
use ringsim_types::{NodeId, NodeState, SimTime};
use tracing_test::traced_test;

const SETTLE_LIMIT: SimTime = SimTime(20_000);

fn ids(raw: &[u64]) -> Vec<NodeId> {
    raw.iter().copied().map(NodeId).collect()
}

fn settle(coordinator: &mut RingCoordinator) {
    assert!(
        coordinator.run_until_settled(SETTLE_LIMIT),
        "ring did not settle:\n{}",
        coordinator.report()
    );
    let violations = InvariantChecker::check_settled(coordinator);
    assert!(violations.is_empty(), "violations: {violations:?}");
}

#[traced_test]
#[test]
fn test_single_join_splices_between_neighbours() {
    let mut coordinator = RingCoordinator::from_scenario(
        ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(1))),
        NetworkConfig::default(),
        7,
    )
    .unwrap();
    settle(&mut coordinator);

    let node = |id| coordinator.node(NodeId(id)).unwrap();
    assert_eq!(node(1).right(), Some(NodeId(2)));
    assert_eq!(node(2).left(), Some(NodeId(1)));
    assert_eq!(node(2).right(), Some(NodeId(49)));
    assert_eq!(node(49).left(), Some(NodeId(2)));
    assert_eq!(node(50).left(), Some(NodeId(49)));
    assert_eq!(node(50).right(), Some(NodeId(1)));
    assert_eq!(node(2).state(), NodeState::Connected);

    assert_eq!(coordinator.dump_ring(), ids(&[1, 2, 49, 50]));
}

#[traced_test]
#[test]
fn test_join_through_far_contact_is_redirected() {
    let mut coordinator = RingCoordinator::from_scenario(
        ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(50))),
        NetworkConfig::default(),
        3,
    )
    .unwrap();
    settle(&mut coordinator);

    assert_eq!(coordinator.dump_ring(), ids(&[1, 2, 49, 50]));
    assert!(InvariantChecker::redirect_hops(coordinator.event_log())[&NodeId(2)] >= 1);
}

#[traced_test]
#[test]
fn test_concurrent_joins_every_contact_pair() {
    for contact_2 in [1, 49, 50] {
        for contact_3 in [1, 49, 50] {
            for seed in 0..10 {
                let mut coordinator = RingCoordinator::from_scenario(
                    ScenarioBuilder::new([1, 49, 50])
                        .joiner(2, Contact::Fixed(NodeId(contact_2)))
                        .joiner(3, Contact::Fixed(NodeId(contact_3))),
                    NetworkConfig::default(),
                    seed,
                )
                .unwrap();
                settle(&mut coordinator);

                assert_eq!(
                    coordinator.dump_ring(),
                    ids(&[1, 2, 3, 49, 50]),
                    "contacts ({contact_2}, {contact_3}), seed {seed}"
                );
            }
        }
    }
}

#[traced_test]
#[test]
fn test_simple_scenario_settles() {
    for seed in 0..20 {
        let mut coordinator =
            RingCoordinator::from_scenario(ScenarioBuilder::simple(), NetworkConfig::default(), seed)
                .unwrap();
        settle(&mut coordinator);
        assert_eq!(coordinator.dump_ring(), ids(&[1, 2, 3, 49, 50]));
    }
}

#[traced_test]
#[test]
fn test_generated_rings_settle() {
    for nodes in [5, 10, 15] {
        for seed in 0..5 {
            let config = SimulatorConfig::new(nodes).with_seed(seed);
            let mut coordinator = RingCoordinator::build(&config).unwrap();
            settle(&mut coordinator);

            let expected: Vec<NodeId> = (1..=nodes).map(NodeId).collect();
            assert_eq!(coordinator.dump_ring(), expected, "n={nodes} seed={seed}");

            let metrics = JoinMetrics::from_log(coordinator.event_log()).unwrap();
            assert_eq!(metrics.joins_completed(), nodes - 3);
            assert!(metrics.incomplete_joins().is_empty());
        }
    }
}

#[traced_test]
#[test]
fn test_right_hops_close_the_ring() {
    let mut coordinator = RingCoordinator::build(&SimulatorConfig::new(12).with_seed(4)).unwrap();
    settle(&mut coordinator);

    let count = coordinator.runner().node_count();
    for start in coordinator.nodes().map(|node| node.id()) {
        let mut current = start;
        for _ in 0..count {
            current = coordinator.node(current).unwrap().right().unwrap();
        }
        assert_eq!(current, start);

        let walk = coordinator.traverse_from(start);
        assert!(walk.closed);
        assert_eq!(walk.nodes.len(), count);
    }
    assert!(coordinator.report().ring.is_ascending_cycle());
}

#[traced_test]
#[test]
fn test_parallel_sends_settle() {
    for seed in 0..5 {
        let config = SimulatorConfig::new(10)
            .with_seed(seed)
            .with_network(NetworkConfig::default().with_sequential_sends(false));
        let mut coordinator = RingCoordinator::build(&config).unwrap();
        settle(&mut coordinator);
        assert_eq!(coordinator.dump_ring(), (1..=10).map(NodeId).collect::<Vec<_>>());
    }
}

#[traced_test]
#[test]
fn test_same_seed_same_run() {
    let run = |seed| {
        let mut coordinator =
            RingCoordinator::build(&SimulatorConfig::new(10).with_seed(seed)).unwrap();
        coordinator.run(SimTime(200));
        coordinator
    };

    let first = run(99);
    let second = run(99);
    assert_eq!(first.event_log(), second.event_log());
    assert_eq!(first.dump_ring(), second.dump_ring());
    assert_eq!(first.now(), second.now());
    assert_eq!(
        first.stats().messages_delivered,
        second.stats().messages_delivered
    );
}

#[traced_test]
#[test]
fn test_event_log_exports_as_json() {
    let mut coordinator = RingCoordinator::from_scenario(
        ScenarioBuilder::new([1, 49, 50]).joiner(2, Contact::Fixed(NodeId(1))),
        NetworkConfig::default(),
        11,
    )
    .unwrap();
    settle(&mut coordinator);

    let json = serde_json::to_string(coordinator.event_log()).unwrap();
    let restored: ringsim_simulation::EventLog = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, coordinator.event_log());
}
