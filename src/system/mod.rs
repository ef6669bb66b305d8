// src/system/mod.rs

//! Poll cycles across all branches of a bus.

mod report;

pub use report::{CycleOutcome, CycleReport, FailureKind, LeafFailure};

use crate::branch::Branch;
use crate::common::{
    config::{Duplex, SystemConfig},
    error::XerxesError,
};
use crate::leaves::Node;
use crate::network::Channel;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Scheduler phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Idle,
    /// At least one cycle is in flight.
    Active,
}

#[derive(Debug)]
struct CycleState {
    phase: Phase,
    in_flight: usize,
    cycles: u64,
}

struct Shared<C: Channel> {
    config: SystemConfig,
    channel: Mutex<C>,
    branches: Mutex<Vec<Branch<C>>>,
    state: Mutex<CycleState>,
    idle: Condvar,
    last_report: Mutex<Option<CycleReport>>,
}

/// Owns the bus and runs poll cycles on background threads.
///
/// In [`Duplex::Half`] mode a cycle holds the bus from the sync broadcast to
/// the last leaf, and [`poll`](PollScheduler::poll) is refused while a cycle
/// is in flight or the bus is held through
/// [`with_channel`](PollScheduler::with_channel). In [`Duplex::Full`] mode
/// cycles may overlap and the bus is locked per leaf fetch.
///
/// Every accepted `poll` starts its own OS thread. Full mode puts no cap on
/// how many cycles, and so threads, are alive at once; pacing `poll` calls is
/// up to the caller.
pub struct PollScheduler<C: Channel> {
    shared: Arc<Shared<C>>,
}

impl<C> PollScheduler<C>
where
    C: Channel + Send + 'static,
{
    pub fn new(channel: C, config: SystemConfig) -> Self {
        PollScheduler {
            shared: Arc::new(Shared {
                config,
                channel: Mutex::new(channel),
                branches: Mutex::new(Vec::new()),
                state: Mutex::new(CycleState { phase: Phase::Idle, in_flight: 0, cycles: 0 }),
                idle: Condvar::new(),
                last_report: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.shared.config
    }

    /// Adds a branch. Cycles already running keep their own snapshot.
    pub fn append_branch(&self, branch: Branch<C>) {
        self.shared.branches.lock().push(branch);
    }

    pub fn branches(&self) -> Vec<Branch<C>> {
        self.shared.branches.lock().clone()
    }

    /// Starts a poll cycle and returns without waiting for it.
    ///
    /// Fails with [`XerxesError::NetworkBusy`] in half duplex mode while
    /// another cycle is in flight or the bus is held.
    pub fn poll(&self) -> Result<JoinHandle<CycleReport>, XerxesError<C::Error>> {
        let cycle = {
            let mut state = self.shared.state.lock();
            if self.shared.config.mode == Duplex::Half
                && (state.in_flight > 0 || self.shared.channel.is_locked())
            {
                warn!("trying to access busy network");
                return Err(XerxesError::NetworkBusy);
            }
            state.in_flight += 1;
            state.cycles += 1;
            state.phase = Phase::Active;
            state.cycles
        };

        // Dropped by the worker when the cycle ends, or right here if it never starts.
        let in_flight = InFlight(Arc::clone(&self.shared));

        thread::Builder::new()
            .name(format!("xerxes-poll-{cycle}"))
            .spawn(move || {
                let InFlight(shared) = &in_flight;
                let report = shared.run_cycle(cycle);
                *shared.last_report.lock() = Some(report.clone());
                report
            })
            .map_err(|e| XerxesError::Worker(e.to_string()))
    }

    /// A cycle is in flight, or in half duplex mode the bus is held.
    pub fn busy(&self) -> bool {
        let in_flight = self.shared.state.lock().in_flight > 0;
        in_flight || (self.shared.config.mode == Duplex::Half && self.shared.channel.is_locked())
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Blocks until no cycle is in flight and, in half duplex mode, the bus
    /// is free. Returns `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        {
            let mut state = self.shared.state.lock();
            self.shared.idle.wait_while_until(&mut state, |s| s.in_flight > 0, deadline);
            if state.in_flight > 0 {
                return false;
            }
        }
        match self.shared.config.mode {
            Duplex::Half => self.shared.channel.try_lock_until(deadline).is_some(),
            Duplex::Full => true,
        }
    }

    /// Report of the most recently finished cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.shared.last_report.lock().clone()
    }

    /// Runs `f` with exclusive access to the bus, bounded by the lock timeout.
    pub fn with_channel<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R, XerxesError<C::Error>> {
        let mut channel = self
            .shared
            .channel
            .try_lock_for(self.shared.config.lock_timeout)
            .ok_or(XerxesError::NetworkBusy)?;
        Ok(f(&mut channel))
    }
}

/// Counts one cycle in flight for as long as it lives.
struct InFlight<C: Channel>(Arc<Shared<C>>);

impl<C: Channel> Drop for InFlight<C> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            state.phase = Phase::Idle;
        }
        drop(state);
        self.0.idle.notify_all();
    }
}

impl<C: Channel> Shared<C> {
    fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(cycle);
        debug!("poll cycle {cycle} started ({:?} duplex)", self.config.mode);

        let mut held = match self.config.mode {
            Duplex::Half => match self.channel.try_lock_for(self.config.lock_timeout) {
                Some(channel) => Some(channel),
                None => {
                    warn!("trying to access busy network");
                    report.outcome = CycleOutcome::NetworkBusy;
                    report.duration = started.elapsed();
                    return report;
                }
            },
            Duplex::Full => None,
        };

        if let Err(err) = self.on_bus(&mut held, |channel| channel.sync()) {
            warn!("sync broadcast failed: {err}");
            report.sync_error = Some(err.to_string());
        }
        thread::sleep(self.config.settle_delay);

        let branches = self.branches.lock().clone();
        for leaf in branches.iter().flatten() {
            let address = leaf.address();
            let outcome = self.on_bus(&mut held, |channel| {
                match panic::catch_unwind(AssertUnwindSafe(|| leaf.fetch(channel))) {
                    Ok(fetched) => fetched.map(|()| Ok(())),
                    Err(payload) => Ok(Err(panic_message(payload))),
                }
            });
            match outcome {
                Ok(Ok(())) => report.fetched.push(address),
                Ok(Err(detail)) => report.record_panic(address, detail),
                Err(err) => report.record_error(address, &err),
            }
        }
        drop(held);

        report.duration = started.elapsed();
        debug!(
            "poll cycle {cycle} done in {:?}: {} fetched, {} failed",
            report.duration,
            report.fetched.len(),
            report.failures.len()
        );
        report
    }

    /// Runs `f` on the bus: on the cycle-wide guard when one is held,
    /// otherwise under a freshly acquired lock.
    fn on_bus<T>(
        &self,
        held: &mut Option<MutexGuard<'_, C>>,
        f: impl FnOnce(&mut C) -> Result<T, XerxesError<C::Error>>,
    ) -> Result<T, XerxesError<C::Error>> {
        match held {
            Some(channel) => f(&mut **channel),
            None => {
                let mut channel = self
                    .channel
                    .try_lock_for(self.config.lock_timeout)
                    .ok_or(XerxesError::NetworkBusy)?;
                f(&mut *channel)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{address::XerxesAddr, msg_id::MsgId};
    use crate::leaves::{Leaf, Linear, PLeaf};
    use crate::test_support::{pleaf_body, Behaviour, ScriptedChannel};
    use crate::test_support::MockCommError;
    use std::sync::mpsc;

    type DynNode = Arc<dyn Node<ScriptedChannel>>;

    const A: u8 = 0x0A;
    const B: u8 = 0x0B;
    const C: u8 = 0x0C;

    fn addr(a: u8) -> XerxesAddr {
        XerxesAddr::from_byte(a)
    }

    fn config(mode: Duplex) -> SystemConfig {
        SystemConfig::new(mode)
            .with_settle_delay(Duration::ZERO)
            .with_lock_timeout(Duration::from_millis(50))
    }

    fn measurement(body: &[u8]) -> Behaviour {
        Behaviour::Reply(MsgId::MeasurementReply, body.to_vec())
    }

    struct Panicking(XerxesAddr);

    impl Node<ScriptedChannel> for Panicking {
        fn address(&self) -> XerxesAddr {
            self.0
        }

        fn fetch(&self, _channel: &mut ScriptedChannel) -> Result<(), XerxesError<MockCommError>> {
            panic!("boom");
        }
    }

    #[test]
    fn test_cycle_isolates_leaf_faults() {
        let channel = ScriptedChannel::new()
            .with(A, measurement(&[1]))
            .with(B, Behaviour::Checksum)
            .with(C, measurement(&[3]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));

        let leaves: Vec<Arc<Leaf>> = [A, B, C].iter().map(|a| Arc::new(Leaf::new(addr(*a)))).collect();
        scheduler.append_branch(leaves.iter().map(|l| Arc::clone(l) as DynNode).collect());

        let report = scheduler.poll().unwrap().join().unwrap();
        assert_eq!(report.cycle, 1);
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.fetched, vec![addr(A), addr(C)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failure(addr(B)).unwrap().kind, FailureKind::Checksum);
        assert!(report.sync_error.is_none());

        assert_eq!(leaves[0].readings().len(), 1);
        assert!(leaves[1].readings().is_empty());
        assert_eq!(leaves[2].pop().unwrap().reply.payload(), &[3]);

        let sent = scheduler.with_channel(|c| c.destinations()).unwrap();
        assert_eq!(sent, vec![0xFF, A, B, C]);
        assert_eq!(scheduler.last_report(), Some(report));
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn test_silent_and_incomplete_leaves() {
        let channel = ScriptedChannel::new().with(A, Behaviour::Incomplete).with(C, measurement(&[]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));
        let mut branch: Branch<ScriptedChannel> = Branch::new();
        for a in [A, B, C] {
            branch.push(Arc::new(Leaf::new(addr(a))));
        }
        scheduler.append_branch(branch);

        let report = scheduler.poll().unwrap().join().unwrap();
        assert_eq!(report.failure(addr(A)).unwrap().kind, FailureKind::Incomplete);
        assert_eq!(report.failure(addr(B)).unwrap().kind, FailureKind::Timeout);
        assert_eq!(report.fetched, vec![addr(C)]);
    }

    #[test]
    fn test_half_duplex_refuses_overlapping_poll() {
        let (release, gate) = mpsc::channel();
        let channel = ScriptedChannel::new().with(A, measurement(&[1])).gated(gate);
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));
        let leaf = Arc::new(Leaf::new(addr(A)));
        scheduler.append_branch([Arc::clone(&leaf) as DynNode].into_iter().collect());

        let first = scheduler.poll().unwrap();
        assert!(scheduler.busy());
        assert_eq!(scheduler.phase(), Phase::Active);
        assert!(matches!(scheduler.poll(), Err(XerxesError::NetworkBusy)));
        assert!(!scheduler.wait(Duration::from_millis(20)));

        release.send(()).unwrap();
        assert!(scheduler.wait(Duration::from_secs(5)));
        assert!(!scheduler.busy());
        assert_eq!(scheduler.phase(), Phase::Idle);

        let report = first.join().unwrap();
        assert!(report.is_clean());
        assert_eq!(leaf.readings().len(), 1);

        // idle again, so the next poll is accepted
        let second = scheduler.poll().unwrap().join().unwrap();
        assert_eq!(second.cycle, 2);
        assert_eq!(leaf.readings().len(), 2);
    }

    #[test]
    fn test_wait_when_idle() {
        let scheduler = PollScheduler::new(ScriptedChannel::new(), config(Duplex::Half));
        assert!(scheduler.wait(Duration::ZERO));
        assert_eq!(scheduler.last_report(), None);
    }

    #[test]
    fn test_full_duplex_allows_overlap() {
        let channel = ScriptedChannel::new().with(A, measurement(&[1])).with(B, measurement(&[2]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Full).with_lock_timeout(Duration::from_secs(1)));
        let leaves: Vec<Arc<Leaf>> = [A, B].iter().map(|a| Arc::new(Leaf::new(addr(*a)))).collect();
        scheduler.append_branch(leaves.iter().map(|l| Arc::clone(l) as DynNode).collect());

        let first = scheduler.poll().unwrap();
        let second = scheduler.poll().unwrap();
        let reports = [first.join().unwrap(), second.join().unwrap()];
        assert!(reports.iter().all(CycleReport::is_clean));
        assert!(scheduler.wait(Duration::from_secs(1)));

        for leaf in &leaves {
            assert_eq!(leaf.readings().len(), 2);
        }
        let sent = scheduler.with_channel(|c| c.destinations()).unwrap();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent.iter().filter(|d| **d == 0xFF).count(), 2);
    }

    #[test]
    fn test_half_duplex_refuses_poll_on_held_bus() {
        let scheduler = PollScheduler::new(ScriptedChannel::new(), config(Duplex::Half));
        scheduler.append_branch([Arc::new(Leaf::new(addr(A))) as DynNode].into_iter().collect());

        scheduler
            .with_channel(|_| {
                let started = Instant::now();
                assert!(matches!(scheduler.poll(), Err(XerxesError::NetworkBusy)));
                assert!(started.elapsed() < Duration::from_millis(50));
                assert!(scheduler.busy());
                assert!(!scheduler.wait(Duration::ZERO));
                assert_eq!(scheduler.phase(), Phase::Idle);
            })
            .unwrap();

        assert!(scheduler.with_channel(|c| c.destinations()).unwrap().is_empty());
        assert!(!scheduler.busy());
        assert!(scheduler.wait(Duration::ZERO));
        assert_eq!(scheduler.last_report(), None);
    }

    #[test]
    fn test_wait_blocks_until_bus_released() {
        let scheduler = PollScheduler::new(ScriptedChannel::new(), config(Duplex::Half));
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let holder = &scheduler;
            s.spawn(move || {
                holder
                    .with_channel(|_| {
                        held_tx.send(()).unwrap();
                        let _ = release_rx.recv_timeout(Duration::from_secs(5));
                    })
                    .unwrap();
            });

            held_rx.recv().unwrap();
            assert!(scheduler.busy());
            assert!(!scheduler.wait(Duration::from_millis(20)));

            release_tx.send(()).unwrap();
            assert!(scheduler.wait(Duration::from_secs(5)));
        });

        assert!(!scheduler.busy());
        assert!(scheduler.poll().unwrap().join().unwrap().is_clean());
    }

    #[test]
    fn test_full_duplex_fetch_times_out_on_held_bus() {
        let channel = ScriptedChannel::new().with(A, measurement(&[1]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Full));
        scheduler.append_branch([Arc::new(Leaf::new(addr(A))) as DynNode].into_iter().collect());

        let report = scheduler
            .with_channel(|_| scheduler.poll().unwrap().join().unwrap())
            .unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert!(report.sync_error.is_some());
        assert_eq!(report.failure(addr(A)).unwrap().kind, FailureKind::Busy);
    }

    #[test]
    fn test_panicking_leaf_is_contained() {
        let channel = ScriptedChannel::new().with(B, measurement(&[2]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));
        let good = Arc::new(Leaf::new(addr(B)));
        let mut branch: Branch<ScriptedChannel> = Branch::new();
        branch.push(Arc::new(Panicking(addr(A))));
        branch.push(Arc::clone(&good) as DynNode);
        scheduler.append_branch(branch);

        let report = scheduler.poll().unwrap().join().unwrap();
        let failure = report.failure(addr(A)).unwrap();
        assert_eq!(failure.kind, FailureKind::Other);
        assert_eq!(failure.detail, "boom");
        assert_eq!(report.fetched, vec![addr(B)]);
        assert_eq!(good.readings().len(), 1);

        // the bus lock survives the panic
        assert!(scheduler.with_channel(|_| ()).is_ok());
    }

    #[test]
    fn test_branches_polled_in_order() {
        let channel = ScriptedChannel::new()
            .with(A, measurement(&[]))
            .with(B, measurement(&[]))
            .with(C, measurement(&[]));
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));
        scheduler.append_branch([Arc::new(Leaf::new(addr(C))) as DynNode].into_iter().collect());
        scheduler.append_branch(
            [A, B].iter().map(|a| Arc::new(Leaf::new(addr(*a))) as DynNode).collect(),
        );
        assert_eq!(scheduler.branches().len(), 2);

        let report = scheduler.poll().unwrap().join().unwrap();
        assert_eq!(report.fetched, vec![addr(C), addr(A), addr(B)]);
    }

    #[test]
    fn test_pleaf_readings_through_scheduler() {
        let body = pleaf_body([1_000, 293_150, 293_150, 293_150]);
        let channel = ScriptedChannel::new().with(A, measurement(&body)).with(B, measurement(&body));
        let scheduler = PollScheduler::new(channel, config(Duplex::Half));
        let leaves: Vec<Arc<PLeaf>> = PLeaf::from_addresses([addr(A), addr(B)], Arc::new(Linear::IDENTITY))
            .into_iter()
            .map(Arc::new)
            .collect();
        scheduler.append_branch(leaves.iter().map(|l| Arc::clone(l) as DynNode).collect());

        for _ in 0..3 {
            scheduler.poll().unwrap().join().unwrap();
        }
        let batch = leaves[0].pop_all();
        assert_eq!(batch.len(), 3);
        let avg = PLeaf::average(&batch).unwrap();
        assert_eq!(avg.nivelation, 1000.0);
        assert_eq!(avg.invalid, 0);
        assert_eq!(leaves[1].readings().len(), 3);
    }
}
