//! Worker threads.
//!
//! Cancellation is by channel close: the orchestrator holds the only
//! `Sender<()>` of a zero-capacity shutdown channel and drops it on stop. Every
//! blocking wait in a worker also watches that receiver, so each worker exits
//! within one poll timeout.

use crossbeam_channel::{select, Receiver, RecvTimeoutError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::metrics::{AliveGuard, PipelineMetrics};
use crate::RuntimeError;

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Spawn a named worker thread whose alive flag is held for its whole run.
pub(crate) fn spawn_named<F>(
    name: &str,
    alive: Arc<AtomicBool>,
    body: F,
) -> Result<JoinHandle<()>, RuntimeError>
where
    F: FnOnce() + Send + 'static,
{
    let thread_name = format!("attune-{}", name);
    let handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let _alive = AliveGuard::new(alive);
            log::info!("{}: started", thread_name);
            body();
            log::info!("{}: stopped", thread_name);
        })
        .map_err(RuntimeError::Spawn)?;
    Ok(handle)
}

/// Run `f` once, containing any panic and counting it in `panics`.
/// Returns `false` if it panicked.
pub(crate) fn run_isolated<F: FnOnce()>(name: &str, panics: &AtomicU64, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let total = PipelineMetrics::bump(panics);
            log::error!(
                "{} worker: panic contained ({}), total panics {}",
                name,
                panic_message(payload.as_ref()),
                total
            );
            false
        }
    }
}

/// Modality worker loop: bounded-timeout receive, handle one sample at a time.
pub(crate) fn modality_loop<S, F>(
    name: &str,
    samples: Receiver<S>,
    shutdown: Receiver<()>,
    poll_timeout: Duration,
    metrics: &PipelineMetrics,
    mut handle: F,
) where
    F: FnMut(S),
{
    loop {
        select! {
            recv(shutdown) -> _ => break,
            recv(samples) -> msg => match msg {
                Ok(sample) => {
                    run_isolated(name, &metrics.analyzer_panics, || handle(sample));
                }
                Err(_) => break,
            },
            default(poll_timeout) => {}
        }
    }
}

/// Fixed-cadence loop: sleep on the shutdown channel, tick on timeout.
pub(crate) fn ticker_loop<F>(
    name: &str,
    shutdown: Receiver<()>,
    interval: Duration,
    metrics: &PipelineMetrics,
    mut tick: F,
) where
    F: FnMut(),
{
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                run_isolated(name, &metrics.tick_panics, &mut tick);
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
