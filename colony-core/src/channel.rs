//! Actor boundary between a driver and the growth engine.
//!
//! A dedicated worker thread owns all simulation state. The driver talks to
//! it through two bounded queues: commands in, responses out. The only
//! shared memory is an atomic cancellation epoch.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{
    Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};
use log::{debug, info, warn};

use crate::{
    batcher::UpdateBatcher,
    config::Config,
    engine::GrowthEngine,
    error::{ChannelError, GraphError},
    graph::{CellGraph, CellSpec},
    protocol::{BandedSeed, Command, GenerateRange, Response, SingleSeed, decode_command},
};

/// A command stamped with the cancellation epoch current when it was sent.
#[derive(Debug)]
struct Envelope {
    epoch: u64,
    command: Command,
}

/// Driver-side handle to one simulation instance.
///
/// Dropping the handle closes both queues and joins the worker.
pub struct SimulationChannel {
    tx: Option<Sender<Envelope>>,
    rx: Option<Receiver<Response>>,
    epoch: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SimulationChannel {
    /// Validates `cfg` and starts the worker thread.
    pub fn spawn(cfg: Config) -> Result<Self, ChannelError> {
        cfg.validate()?;
        let (tx, commands) = bounded::<Envelope>(cfg.command_capacity);
        let (responses, rx) = bounded::<Response>(cfg.response_capacity);
        let epoch = Arc::new(AtomicU64::new(0));

        let worker = Worker::new(cfg, responses, Arc::clone(&epoch));
        let handle = thread::Builder::new()
            .name("colony-growth-worker".into())
            .spawn(move || worker.run(commands))?;

        Ok(Self {
            tx: Some(tx),
            rx: Some(rx),
            epoch,
            handle: Some(handle),
        })
    }

    fn stamp(&self, command: Command) -> Envelope {
        Envelope {
            epoch: self.epoch.load(Ordering::Acquire),
            command,
        }
    }

    fn sender(&self) -> Result<&Sender<Envelope>, ChannelError> {
        self.tx.as_ref().ok_or(ChannelError::Disconnected)
    }

    fn receiver(&self) -> Result<&Receiver<Response>, ChannelError> {
        self.rx.as_ref().ok_or(ChannelError::Disconnected)
    }

    /// Queues a command, blocking while the command queue is full.
    ///
    /// The worker blocks in turn while the response queue is full. A driver
    /// that keeps sending response-producing commands without draining can
    /// fill both queues and wait forever, so either drain responses from
    /// another thread or use [`SimulationChannel::try_send`].
    pub fn send(&self, command: Command) -> Result<(), ChannelError> {
        let envelope = self.stamp(command);
        self.sender()?
            .send(envelope)
            .map_err(|_| ChannelError::Disconnected)
    }

    /// Queues a command without blocking.
    pub fn try_send(&self, command: Command) -> Result<(), ChannelError> {
        let envelope = self.stamp(command);
        match self.sender()?.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(env)) => {
                warn!("command queue full; dropping {}", env.command.type_name());
                Err(ChannelError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(ChannelError::Disconnected),
        }
    }

    /// Decodes a `{type, data}` wire message and queues it.
    ///
    /// Unknown or malformed messages are logged and dropped; the channel
    /// stays usable.
    pub fn send_raw(&self, json: &str) -> Result<(), ChannelError> {
        let command = decode_command(json).inspect_err(|err| warn!("dropping message: {err}"))?;
        self.send(command)
    }

    /// Blocks until the next response arrives.
    pub fn recv(&self) -> Result<Response, ChannelError> {
        self.receiver()?
            .recv()
            .map_err(|_| ChannelError::Disconnected)
    }

    /// `Ok(None)` if nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Response>, ChannelError> {
        match self.receiver()?.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    pub fn try_recv(&self) -> Option<Response> {
        match self.receiver().ok()?.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Every response that is ready right now, in arrival order.
    pub fn drain(&self) -> Vec<Response> {
        match self.rx.as_ref() {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Cancels every `generate` sent before this call, whether it is
    /// running or still queued. Commands sent afterwards are unaffected.
    pub fn cancel(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("cancellation epoch is now {epoch}");
    }
}

impl Drop for SimulationChannel {
    fn drop(&mut self) {
        self.tx.take();
        self.rx.take();
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.join()
        {
            warn!("growth worker thread panicked: {err:?}");
        }
    }
}

struct Simulation {
    engine: GrowthEngine,
    batcher: UpdateBatcher,
}

/// Worker-side state: buffered cell specs until the graph is built, then
/// the engine and its batcher.
struct Worker {
    cfg: Config,
    pending: Vec<CellSpec>,
    sim: Option<Simulation>,
    out: Sender<Response>,
    epoch: Arc<AtomicU64>,
}

impl Worker {
    fn new(cfg: Config, out: Sender<Response>, epoch: Arc<AtomicU64>) -> Self {
        Self {
            cfg,
            pending: Vec::new(),
            sim: None,
            out,
            epoch,
        }
    }

    fn run(mut self, commands: Receiver<Envelope>) {
        while let Ok(Envelope { epoch, command }) = commands.recv() {
            debug!("worker received {}", command.type_name());
            if !self.handle(epoch, command) {
                break;
            }
        }
        debug!("growth worker shutting down");
    }

    fn reply(&self, response: Response) -> bool {
        self.out.send(response).is_ok()
    }

    /// Builds the engine from the buffered specs on first use.
    ///
    /// The specs are kept when validation fails, so a driver may add the
    /// missing cells and retry.
    fn ensure_engine(&mut self) -> Result<(), String> {
        if self.sim.is_some() {
            return Ok(());
        }
        let graph = CellGraph::from_specs(self.pending.clone()).map_err(|err| {
            warn!("cell graph rejected: {err}");
            err.to_string()
        })?;
        let engine = GrowthEngine::new(graph, self.cfg).map_err(|err| err.to_string())?;
        let batcher = engine.new_batcher();
        self.pending = Vec::new();
        self.sim = Some(Simulation { engine, batcher });
        Ok(())
    }

    /// Processes one command.
    ///
    /// ### Returns
    /// `false` once the driver has stopped listening for responses.
    fn handle(&mut self, epoch: u64, command: Command) -> bool {
        if let Command::AddCell(spec) = command {
            if self.sim.is_some() {
                warn!("addCell for {} after the graph was built", spec.index);
                return self.reply(Response::Error(GraphError::Frozen.to_string()));
            }
            self.pending.push(spec);
            return true;
        }

        if let Err(message) = self.ensure_engine() {
            return self.reply(Response::Error(message));
        }
        let Some(sim) = self.sim.as_mut() else {
            return true;
        };

        match command {
            Command::AddCell(_) => true,
            Command::InitCell(SingleSeed { start_index }) => {
                match sim.engine.seed_single(start_index, 0, &mut sim.batcher) {
                    Ok(_) => true,
                    Err(err) => self.out.send(Response::Error(err.to_string())).is_ok(),
                }
            }
            Command::InitCells(BandedSeed { damp_factor }) => {
                match sim.engine.seed_banded(damp_factor, &mut sim.batcher) {
                    Ok(seeds) => {
                        info!("banded seeding placed {} seeds", seeds.len());
                        true
                    }
                    Err(err) => self.out.send(Response::Error(err.to_string())).is_ok(),
                }
            }
            Command::GetInitialCellsData => self
                .out
                .send(Response::SetInitialCellsData(sim.engine.initial_cells_data()))
                .is_ok(),
            Command::Generate(range) => {
                Self::generate(sim, range, epoch, &self.out, &self.epoch)
            }
        }
    }

    fn generate(
        sim: &mut Simulation,
        range: GenerateRange,
        epoch: u64,
        out: &Sender<Response>,
        current: &AtomicU64,
    ) -> bool {
        let disconnected = std::cell::Cell::new(false);
        let result = sim.engine.generate(
            range,
            &mut sim.batcher,
            |batch| {
                if out.send(Response::UpdateCells(batch)).is_err() {
                    disconnected.set(true);
                }
            },
            || disconnected.get() || current.load(Ordering::Acquire) != epoch,
        );
        if disconnected.get() {
            return false;
        }

        match result {
            Ok(report) => {
                for err in report.errors {
                    if out.send(Response::Error(err.to_string())).is_err() {
                        return false;
                    }
                }
                if report.cancelled {
                    info!("generate cancelled after {} generations", report.generations_run);
                    return out
                        .send(Response::Cancelled {
                            generation: report.last_generation,
                        })
                        .is_ok();
                }
                true
            }
            Err(err) => {
                warn!("generate rejected: {err}");
                out.send(Response::Error(err.to_string())).is_ok()
            }
        }
    }
}
