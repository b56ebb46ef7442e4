mod common;

use std::{collections::HashSet, time::Duration};

use colony_core::{
    channel::SimulationChannel,
    config::Config,
    error::{ChannelError, ProtocolError},
    protocol::{
        BandedSeed, Command, GenerateRange, InitialCellData, Response, SingleSeed, UpdateBatch,
    },
    types::Generation,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawn_with(cfg: Config, specs: Vec<colony_core::graph::CellSpec>) -> SimulationChannel {
    init_logging();
    let sim = SimulationChannel::spawn(cfg).unwrap();
    for spec in specs {
        sim.send(Command::AddCell(spec)).unwrap();
    }
    sim
}

/// Sends `getInitialCellsData` as a barrier and returns everything received
/// before its answer, plus the answer itself.
fn barrier(sim: &SimulationChannel) -> (Vec<Response>, Vec<InitialCellData>) {
    sim.send(Command::GetInitialCellsData).unwrap();
    let mut before = Vec::new();
    loop {
        match sim.recv_timeout(TIMEOUT).unwrap() {
            Some(Response::SetInitialCellsData(data)) => return (before, data),
            Some(other) => before.push(other),
            None => panic!("worker did not answer within {TIMEOUT:?}"),
        }
    }
}

fn batches(responses: &[Response]) -> Vec<&UpdateBatch> {
    responses
        .iter()
        .filter_map(|r| match r {
            Response::UpdateCells(b) => Some(b),
            _ => None,
        })
        .collect()
}

#[test]
fn wire_messages_drive_a_full_run() {
    init_logging();
    let sim = SimulationChannel::spawn(Config {
        lifetime: 4,
        ..Config::default()
    })
    .unwrap();

    for spec in common::ring_specs() {
        let json = serde_json::json!({ "type": "addCell", "data": spec }).to_string();
        sim.send_raw(&json).unwrap();
    }
    sim.send_raw(r#"{"type":"initCell","data":{"startIndex":0}}"#)
        .unwrap();
    sim.send_raw(r#"{"type":"generate","data":{"startGen":1,"numGens":3}}"#)
        .unwrap();

    let (before, data) = barrier(&sim);
    let batches = batches(&before);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].generation, 3);
    assert_eq!(batches[0].batch_updates.len(), 7);
    for snap in &batches[0].batch_updates {
        assert_eq!(snap.state, vec![0, 1, 2, 3]);
        assert_eq!(snap.latest_generation, Some(3));
    }
    assert_eq!(data.len(), 7);
    assert!(data.iter().all(|d| d.state == vec![0, 1, 2, 3]));
}

#[test]
fn unknown_message_types_are_dropped_and_processing_continues() {
    let sim = spawn_with(Config::default(), common::ring_specs());

    let err = sim.send_raw(r#"{"type":"explode","data":{}}"#).unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Protocol(ProtocolError::UnknownMessageType(ref t)) if t == "explode"
    ));
    assert!(matches!(
        sim.send_raw(r#"{"data":{}}"#),
        Err(ChannelError::Protocol(ProtocolError::MissingType))
    ));

    sim.send(Command::InitCell(SingleSeed { start_index: 0 }))
        .unwrap();
    let (_, data) = barrier(&sim);
    assert!(data.iter().all(|d| d.state == vec![0]));
}

#[test]
fn incremental_generates_continue_and_stay_ordered() {
    let sim = spawn_with(
        Config {
            threshold: 1,
            batch_size: 50,
            lifetime: 6,
            ..Config::default()
        },
        common::grid_specs(12, 12, 1),
    );
    sim.send(Command::InitCell(SingleSeed { start_index: 0 }))
        .unwrap();
    let mut start: Generation = 1;
    for n in [1, 3, 2, 4, 5] {
        sim.send(Command::Generate(GenerateRange {
            start_gen: start,
            num_gens: n,
        }))
        .unwrap();
        start += Generation::from(n);
    }

    let (before, data) = barrier(&sim);
    assert!(
        before
            .iter()
            .all(|r| matches!(r, Response::UpdateCells(_))),
        "{before:?}"
    );
    let batches = batches(&before);
    let gens: Vec<Generation> = batches.iter().map(|b| b.generation).collect();
    assert!(gens.windows(2).all(|w| w[0] <= w[1]), "{gens:?}");
    assert_eq!(*gens.last().unwrap(), 15);

    // Every batch is duplicate-free and, together, they cover exactly the
    // cells that were ever written.
    let mut seen = HashSet::new();
    for batch in &batches {
        let ids: HashSet<usize> = batch.batch_updates.iter().map(|s| s.index).collect();
        assert_eq!(ids.len(), batch.batch_updates.len());
        seen.extend(ids);
    }
    let written: HashSet<usize> = data
        .iter()
        .filter(|d| !d.state.is_empty())
        .map(|d| d.index)
        .collect();
    assert_eq!(seen, written);

    // The last snapshot of each cell matches the final state.
    for batch in &batches {
        for snap in &batch.batch_updates {
            let last_seen = batches
                .iter()
                .rev()
                .find_map(|b| b.batch_updates.iter().find(|s| s.index == snap.index))
                .unwrap();
            assert_eq!(last_seen.state, data[snap.index].state);
        }
    }
}

#[test]
fn single_flush_holds_each_mutated_cell_once() {
    let sim = spawn_with(
        Config {
            lifetime: 5,
            ..Config::default()
        },
        common::grid_specs(10, 10, 1),
    );
    sim.send(Command::InitCell(SingleSeed { start_index: 44 }))
        .unwrap();
    sim.send(Command::Generate(GenerateRange {
        start_gen: 1,
        num_gens: 8,
    }))
    .unwrap();

    let (before, data) = barrier(&sim);
    let batches = batches(&before);
    assert_eq!(batches.len(), 1);
    let mutated = data.iter().filter(|d| !d.state.is_empty()).count();
    assert_eq!(batches[0].batch_updates.len(), mutated);
}

#[test]
fn banded_seeding_over_the_channel() {
    let sim = spawn_with(
        Config {
            lifetime: 8,
            ..Config::default()
        },
        common::grid_specs(4, 4, 2),
    );
    // Rows 0-1 are medium 0 (top at y = -5), rows 2-3 medium 1 (top at 15).
    sim.send(Command::InitCells(BandedSeed { damp_factor: 5.0 }))
        .unwrap();
    let (before, data) = barrier(&sim);
    assert!(before.is_empty(), "{before:?}");
    assert_eq!(data[0].state, vec![-1]);
    assert_eq!(data[8].state, vec![3]);
    assert_eq!(data[8].medium, 1);
}

#[test]
fn cancel_stops_a_long_range_and_later_commands_still_run() {
    let sim = spawn_with(
        Config {
            lifetime: 4,
            ..Config::default()
        },
        common::ring_specs(),
    );
    sim.send(Command::InitCell(SingleSeed { start_index: 0 }))
        .unwrap();
    sim.send(Command::Generate(GenerateRange {
        start_gen: 1,
        num_gens: u32::MAX,
    }))
    .unwrap();
    sim.cancel();

    let cancelled_at = loop {
        match sim.recv_timeout(TIMEOUT).unwrap() {
            Some(Response::Cancelled { generation }) => break generation,
            Some(Response::UpdateCells(_)) => {}
            other => panic!("unexpected {other:?}"),
        }
    };

    let next = cancelled_at.map_or(1, |g| g + 1);
    sim.send(Command::Generate(GenerateRange {
        start_gen: next,
        num_gens: 2,
    }))
    .unwrap();
    let (before, data) = barrier(&sim);
    assert!(
        before
            .iter()
            .all(|r| !matches!(r, Response::Error(_) | Response::Cancelled { .. })),
        "{before:?}"
    );
    assert_eq!(data.len(), 7);
}

#[test]
fn invalid_graph_is_reported_for_each_command() {
    let mut specs = common::ring_specs();
    specs[3].neighbors.push(40);
    let sim = spawn_with(Config::default(), specs);

    sim.send(Command::InitCell(SingleSeed { start_index: 0 }))
        .unwrap();
    sim.send(Command::GetInitialCellsData).unwrap();
    for _ in 0..2 {
        match sim.recv_timeout(TIMEOUT).unwrap() {
            Some(Response::Error(message)) => assert!(message.contains("40"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn invalid_config_fails_fast() {
    let err = SimulationChannel::spawn(Config {
        lifetime: 0,
        ..Config::default()
    })
    .err()
    .unwrap();
    assert!(matches!(err, ChannelError::Config(_)));
}

#[test]
fn out_of_range_generations_are_reported_and_the_worker_survives() {
    let sim = spawn_with(Config::default(), common::ring_specs());
    sim.send(Command::InitCell(SingleSeed { start_index: 0 }))
        .unwrap();
    sim.send_raw(r#"{"type":"generate","data":{"startGen":9223372036854775807,"numGens":2}}"#)
        .unwrap();
    sim.send_raw(r#"{"type":"generate","data":{"startGen":-9223372036854775808,"numGens":1}}"#)
        .unwrap();

    let (before, data) = barrier(&sim);
    assert_eq!(before.len(), 2, "{before:?}");
    for response in &before {
        match response {
            Response::Error(message) => assert!(message.contains("out of range"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(data.iter().all(|d| d.state == vec![0]));

    sim.send(Command::Generate(GenerateRange {
        start_gen: 1,
        num_gens: 2,
    }))
    .unwrap();
    let (before, data) = barrier(&sim);
    assert!(
        before.iter().all(|r| !matches!(r, Response::Error(_))),
        "{before:?}"
    );
    assert!(data.iter().all(|d| d.state == vec![0, 1, 2]));
}

#[test]
fn seeding_after_generations_ran_is_reported() {
    let sim = spawn_with(Config::default(), common::grid_specs(4, 4, 2));
    sim.send(Command::InitCell(SingleSeed { start_index: 1 }))
        .unwrap();
    sim.send(Command::Generate(GenerateRange {
        start_gen: 1,
        num_gens: 5,
    }))
    .unwrap();
    // Medium 1 is untouched, but generation 0 is long gone.
    sim.send(Command::InitCell(SingleSeed { start_index: 13 }))
        .unwrap();

    let (before, data) = barrier(&sim);
    let errors: Vec<&String> = before
        .iter()
        .filter_map(|r| match r {
            Response::Error(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1, "{before:?}");
    assert!(errors[0].contains("already ran"), "{}", errors[0]);
    assert!(data[13].state.is_empty());
}

#[test]
fn try_send_reports_full_queues_instead_of_blocking() {
    let sim = spawn_with(
        Config {
            command_capacity: 1,
            response_capacity: 1,
            ..Config::default()
        },
        Vec::new(),
    );
    for spec in common::ring_specs() {
        // addCell produces no response, so the worker keeps draining these.
        sim.send(Command::AddCell(spec)).unwrap();
    }

    // Nobody reads responses: the worker stalls and the command queue fills.
    let mut accepted = 0;
    let full = loop {
        match sim.try_send(Command::GetInitialCellsData) {
            Ok(()) => accepted += 1,
            Err(err) => break err,
        }
        assert!(accepted < 16, "queues never filled");
    };
    assert!(matches!(full, ChannelError::QueueFull));

    for _ in 0..accepted {
        match sim.recv_timeout(TIMEOUT).unwrap() {
            Some(Response::SetInitialCellsData(data)) => assert_eq!(data.len(), 7),
            other => panic!("unexpected {other:?}"),
        }
    }
    let (_, data) = barrier(&sim);
    assert_eq!(data.len(), 7);
}
