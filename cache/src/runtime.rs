use crate::policy::TickControl;

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// Where policy timers run.
#[derive(Clone, Default)]
pub enum Scheduler {
  /// All timers of one cache share a single OS thread. It is spawned when the
  /// first timer starts, stays parked while no timer is due and exits once
  /// the cache is dropped.
  #[default]
  Thread,
  /// Timers are tasks on the given Tokio runtime.
  #[cfg(feature = "tokio")]
  Tokio(tokio::runtime::Handle),
}

impl Scheduler {
  /// Uses the Tokio runtime the caller is running on, if any.
  #[cfg(feature = "tokio")]
  pub fn tokio_current() -> Option<Self> {
    tokio::runtime::Handle::try_current().ok().map(Scheduler::Tokio)
  }

  /// The timer runtime of one cache.
  pub(crate) fn runtime(&self) -> TimerRuntime {
    match self {
      Scheduler::Thread => TimerRuntime::Thread(Arc::new(ThreadTimers::default())),
      #[cfg(feature = "tokio")]
      Scheduler::Tokio(runtime) => TimerRuntime::Tokio(runtime.clone()),
    }
  }
}

impl fmt::Debug for Scheduler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scheduler::Thread => f.write_str("Scheduler::Thread"),
      #[cfg(feature = "tokio")]
      Scheduler::Tokio(_) => f.write_str("Scheduler::Tokio"),
    }
  }
}

/// A [`Scheduler`] bound to one cache.
#[derive(Clone)]
pub(crate) enum TimerRuntime {
  Thread(Arc<ThreadTimers>),
  #[cfg(feature = "tokio")]
  Tokio(tokio::runtime::Handle),
}

impl TimerRuntime {
  /// Runs `tick` every `period` until it returns [`TickControl::Stop`] or the
  /// returned handle is dropped.
  pub(crate) fn schedule<F>(&self, period: Duration, tick: F) -> io::Result<ScheduledTick>
  where
    F: FnMut() -> TickControl + Send + 'static,
  {
    let stop = Arc::new(AtomicBool::new(false));
    let handle = match self {
      TimerRuntime::Thread(timers) => TickHandle::Thread(ThreadTimers::add(timers, period, stop.clone(), tick)?),
      #[cfg(feature = "tokio")]
      TimerRuntime::Tokio(runtime) => TickHandle::Tokio(spawn_task(runtime, period, stop.clone(), tick)),
    };
    trace!(?period, "policy timer started");
    Ok(ScheduledTick { stop, handle })
  }
}

struct Timer {
  stop: Arc<AtomicBool>,
  period: Duration,
  next: Instant,
  tick: Box<dyn FnMut() -> TickControl + Send>,
}

#[derive(Default)]
struct TimerState {
  timers: Vec<Timer>,
  worker: Option<Thread>,
}

/// The timers of one cache and the thread that runs them.
///
/// The worker only holds a weak reference between ticks, so dropping the
/// last [`TimerRuntime`] lets it exit.
#[derive(Default)]
pub(crate) struct ThreadTimers {
  state: Mutex<TimerState>,
}

impl ThreadTimers {
  fn add<F>(this: &Arc<Self>, period: Duration, stop: Arc<AtomicBool>, tick: F) -> io::Result<Thread>
  where
    F: FnMut() -> TickControl + Send + 'static,
  {
    let mut state = this.state.lock();
    let worker = match state.worker.clone() {
      Some(worker) => worker,
      None => {
        let timers = Arc::downgrade(this);
        let handle = thread::Builder::new()
          .name("tessel-timer".into())
          .spawn(move || run_worker(timers))?;
        trace!("timer thread spawned");
        let worker = handle.thread().clone();
        state.worker = Some(worker.clone());
        worker
      }
    };
    state.timers.push(Timer {
      stop,
      period,
      next: Instant::now() + period,
      tick: Box::new(tick),
    });
    drop(state);
    // The new timer may be due before whatever the worker is waiting for.
    worker.unpark();
    Ok(worker)
  }

  /// Takes the earliest timer if it is due, otherwise returns how long to
  /// wait. Cancelled timers are dropped on the way.
  fn next_due(&self) -> Result<Timer, Option<Duration>> {
    let mut state = self.state.lock();
    state.timers.retain(|timer| !timer.stop.load(Ordering::Acquire));
    let earliest = state
      .timers
      .iter()
      .enumerate()
      .min_by_key(|(_, timer)| timer.next)
      .map(|(pos, timer)| (pos, timer.next));
    let now = Instant::now();
    match earliest {
      Some((pos, next)) if next <= now => Ok(state.timers.swap_remove(pos)),
      Some((_, next)) => Err(Some(next - now)),
      None => Err(None),
    }
  }
}

impl Drop for ThreadTimers {
  fn drop(&mut self) {
    if let Some(worker) = &self.state.get_mut().worker {
      worker.unpark();
    }
  }
}

fn run_worker(timers: Weak<ThreadTimers>) {
  loop {
    let Some(shared) = timers.upgrade() else {
      trace!("timer thread exiting");
      return;
    };
    match shared.next_due() {
      // Ticks run outside the state lock; they take the cache lock, which
      // may itself be held by a caller starting a timer.
      Ok(mut timer) => {
        if (timer.tick)() == TickControl::Continue && !timer.stop.load(Ordering::Acquire) {
          // Late ticks are delayed, not bunched up.
          timer.next = (timer.next + timer.period).max(Instant::now());
          shared.state.lock().timers.push(timer);
        }
      }
      Err(wait) => {
        drop(shared);
        // Parking can wake spuriously, and new timers or cancellations unpark
        // us early; either way the loop recomputes the deadline.
        match wait {
          Some(wait) => thread::park_timeout(wait),
          None => thread::park(),
        }
      }
    }
  }
}

#[cfg(feature = "tokio")]
fn spawn_task<F>(
  runtime: &tokio::runtime::Handle,
  period: Duration,
  stop: Arc<AtomicBool>,
  mut tick: F,
) -> tokio::task::JoinHandle<()>
where
  F: FnMut() -> TickControl + Send + 'static,
{
  runtime.spawn(async move {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
      interval.tick().await;
      if stop.load(Ordering::Acquire) || tick() == TickControl::Stop {
        break;
      }
    }
  })
}

enum TickHandle {
  Thread(Thread),
  #[cfg(feature = "tokio")]
  Tokio(tokio::task::JoinHandle<()>),
}

/// A running policy timer. Dropping it cancels the timer; a tick that is
/// already executing runs to completion.
pub struct ScheduledTick {
  stop: Arc<AtomicBool>,
  handle: TickHandle,
}

impl ScheduledTick {
  pub fn is_cancelled(&self) -> bool {
    self.stop.load(Ordering::Acquire)
  }
}

impl Drop for ScheduledTick {
  fn drop(&mut self) {
    self.stop.store(true, Ordering::Release);
    // Never join here: the timer may be dropped from inside its own tick.
    match &self.handle {
      TickHandle::Thread(thread) => thread.unpark(),
      #[cfg(feature = "tokio")]
      TickHandle::Tokio(task) => task.abort(),
    }
  }
}

impl fmt::Debug for ScheduledTick {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScheduledTick")
      .field("cancelled", &self.is_cancelled())
      .finish_non_exhaustive()
  }
}
