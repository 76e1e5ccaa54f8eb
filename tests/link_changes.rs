use custom_dv::algorithms::all_pairs_costs;
use custom_dv::config::SimulationConfig;
use custom_dv::network::{DelayModel, Outbox, Simulator, Topology};
use custom_dv::protocol::{RoutingEngine, UpdateOutcome};
use custom_dv::{ContractViolation, Cost, RoutingError, INFINITY};

const I: Cost = INFINITY;

fn converged_line() -> Simulator {
    let topology = Topology::line(&[1, 1]).unwrap();
    let mut simulator = Simulator::new(topology, DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
    assert!(simulator.run().drained);
    assert_eq!(simulator.min_costs(), vec![vec![0, 1, 2], vec![1, 0, 1], vec![2, 1, 0]]);
    simulator
}

#[test]
fn raised_link_reconverges_to_new_shortest_paths() {
    let mut simulator = converged_line();
    simulator.schedule_link_change(50.0, 0, 1, 10).unwrap();

    let report = simulator.run();
    assert!(report.drained);
    assert_eq!(report.link_changes_applied, 2);
    assert_eq!(
        simulator.min_costs(),
        vec![vec![0, 10, 11], vec![10, 0, 1], vec![11, 1, 0]]
    );
}

#[test]
fn raised_link_counts_up_through_the_stale_route() {
    let mut simulator = converged_line();
    simulator.schedule_link_change(50.0, 0, 1, 10).unwrap();

    // node 1 first believes node 2's old route back to node 0
    let mut seen = vec![simulator.node(1).unwrap().min_cost()[0]];
    while simulator.step().is_some() {
        let cost = simulator.node(1).unwrap().min_cost()[0];
        if seen.last() != Some(&cost) {
            seen.push(cost);
        }
    }

    assert_eq!(seen, vec![1, 3, 5, 7, 9, 10]);
}

#[test]
fn lost_link_counts_to_infinity() {
    let mut simulator = converged_line();
    let before = simulator.report();
    simulator.schedule_link_change(50.0, 0, 1, I as i64).unwrap();

    let report = simulator.run();
    assert!(report.drained);
    assert_eq!(
        simulator.min_costs(),
        vec![vec![0, I, I], vec![I, 0, 1], vec![I, 1, 0]]
    );
    // nodes 1 and 2 bounce the stale route until it saturates
    assert!(report.broadcasts - before.broadcasts > 500);
    assert!(simulator.node(0).unwrap().neighbors().is_empty());
}

#[test]
fn costs_above_infinity_clamp() {
    let mut simulator = converged_line();
    simulator.schedule_link_change(50.0, 1, 2, 5_000).unwrap();
    simulator.run();

    assert_eq!(simulator.topology().cost(1, 2), I);
    assert_eq!(simulator.min_costs()[0], vec![0, 1, I]);
}

#[test]
fn classic_script_detours_then_recovers() {
    let config = SimulationConfig::with_link_changes();
    let mut simulator = Simulator::from_config(&config).unwrap();

    simulator.run_until(15_000.0);
    let mut detour = config.topology().unwrap();
    detour.set_cost(0, 1, 20);
    detour.set_cost(1, 0, 20);
    assert_eq!(simulator.min_costs(), all_pairs_costs(&detour));
    assert_eq!(simulator.min_costs()[0], vec![0, 4, 3, 5]);

    let report = simulator.run();
    assert!(report.drained);
    assert_eq!(report.link_changes_applied, 4);
    assert_eq!(simulator.min_costs(), all_pairs_costs(&config.topology().unwrap()));
}

#[test]
fn link_changes_settle_for_every_seed() {
    let config = SimulationConfig::with_link_changes();
    let expected = all_pairs_costs(&config.topology().unwrap());

    for seed in 0..8 {
        let mut config = config.clone();
        config.seed = seed;
        let mut simulator = Simulator::from_config(&config).unwrap();
        simulator.run();
        assert_eq!(simulator.min_costs(), expected, "seed {}", seed);
    }
}

#[test]
fn invalid_change_leaves_node_untouched() {
    let topology = Topology::line(&[1, 1]).unwrap();
    let mut outbox = Outbox::for_node(1, topology.connect_costs(1));
    let mut node = RoutingEngine::initialize(1, topology.connect_costs(1), &mut outbox).unwrap();
    let table = node.table().clone();
    outbox.clear();

    let err = node.on_link_cost_change(1, 4, &mut outbox).unwrap_err();
    assert_eq!(err, RoutingError::Contract(ContractViolation::SelfLink { node: 1 }));
    let err = node.on_link_cost_change(0, -3, &mut outbox).unwrap_err();
    assert!(err.is_contract_violation());

    assert_eq!(node.table(), &table);
    assert!(outbox.sent().is_empty());
}

#[test]
fn new_link_is_announced_over_itself() {
    let topology = Topology::line(&[1, 1]).unwrap();
    let mut outbox = Outbox::for_node(0, topology.connect_costs(0));
    let mut node = RoutingEngine::initialize(0, topology.connect_costs(0), &mut outbox).unwrap();
    outbox.clear();

    // the carrier brings the 0-2 link up before the node learns of it
    outbox.set_link_cost(2, 1);

    let outcome = node.on_link_cost_change(2, 1, &mut outbox).unwrap();
    assert_eq!(outcome, UpdateOutcome::Broadcast { recipients: vec![1, 2] });
    assert_eq!(node.min_cost().as_slice(), &[0, 1, 1]);
    assert!(outbox.sent().iter().any(|p| p.dest_id == 2));
}
