//! One discovery session per open form.
//!
//! The session owns the generation counter. Selecting a key starts a tokio
//! task running the pipeline; the task reports its result over a channel and
//! the session applies it only after the staleness guard accepted the tag.
//! All field mutation goes through the projector.

use std::sync::Arc;

use fieldscout_types::{DiscoveryResult, FieldOption, FormSnapshot, GenerationTag, SelectionKey};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::pipeline::DiscoveryPipeline;
use crate::projector::{FormProfile, FormStateProjector, ProjectorError};
use crate::staleness::{BeginOutcome, StalenessGuard};

/// Holds the current selection key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceKeyStore {
    key: Option<SelectionKey>,
}

impl ResourceKeyStore {
    pub fn set(&mut self, key: SelectionKey) {
        self.key = Some(key);
    }

    pub fn current(&self) -> Option<&SelectionKey> {
        self.key.as_ref()
    }

    pub fn clear(&mut self) {
        self.key = None;
    }
}

struct InFlight {
    tag: GenerationTag,
    handle: JoinHandle<()>,
}

enum Next {
    Reported(DiscoveryResult),
    Ended(Result<(), JoinError>),
}

pub struct DiscoverySession<P: FormProfile> {
    pipeline: Arc<dyn DiscoveryPipeline>,
    projector: FormStateProjector<P>,
    guard: StalenessGuard,
    keys: ResourceKeyStore,
    in_flight: Option<InFlight>,
    completions_tx: UnboundedSender<DiscoveryResult>,
    completions_rx: UnboundedReceiver<DiscoveryResult>,
    options: SessionConfig,
}

impl<P: FormProfile> DiscoverySession<P> {
    pub fn new(pipeline: Arc<dyn DiscoveryPipeline>, profile: P, options: SessionConfig) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();
        Self {
            pipeline,
            projector: FormStateProjector::new(profile),
            guard: StalenessGuard::new(),
            keys: ResourceKeyStore::default(),
            in_flight: None,
            completions_tx,
            completions_rx,
            options,
        }
    }

    /// Change the selection. Must be called from within a tokio runtime.
    ///
    /// Reselecting the key whose run is still in flight keeps that run and
    /// starts nothing.
    pub fn select(&mut self, key: impl Into<SelectionKey>) -> BeginOutcome {
        let outcome = self.guard.begin(key.into());
        let BeginOutcome::Started(tag) = &outcome else {
            return outcome;
        };

        self.keys.set(tag.key.clone());
        self.projector.begin_selection(tag);

        if let Some(previous) = self.in_flight.take() {
            if self.options.abort_superseded {
                debug!(selection = %previous.tag.key, generation = previous.tag.generation, "aborting superseded run");
                previous.handle.abort();
            } else {
                debug!(selection = %previous.tag.key, generation = previous.tag.generation, "detaching superseded run");
            }
        }

        let pipeline = Arc::clone(&self.pipeline);
        let completions = self.completions_tx.clone();
        let run_tag = tag.clone();
        let handle = tokio::spawn(async move {
            let result = pipeline.run(run_tag).await;
            // The receiver only goes away with the session.
            let _ = completions.send(result);
        });
        self.in_flight = Some(InFlight { tag: tag.clone(), handle });
        outcome
    }

    /// Apply a completed run. Returns whether it was current.
    pub fn apply(&mut self, result: DiscoveryResult) -> bool {
        if !self.guard.accept(&result) {
            return false;
        }
        if self.in_flight.as_ref().is_some_and(|in_flight| in_flight.tag == result.tag) {
            self.in_flight = None;
        }
        self.projector.accept(&result);
        true
    }

    /// Wait for the next completion and apply it. `None` when nothing is in flight.
    ///
    /// A run task that ends without reporting (panic or abort) settles its
    /// generation instead of leaving the caller waiting.
    pub async fn next_completion(&mut self) -> Option<bool> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            let result = self.completions_rx.try_recv().ok()?;
            return Some(self.apply(result));
        };
        let next = tokio::select! {
            biased;
            Some(result) = self.completions_rx.recv() => Next::Reported(result),
            joined = &mut in_flight.handle => Next::Ended(joined),
        };
        let joined = match next {
            Next::Reported(result) => return Some(self.apply(result)),
            Next::Ended(joined) => joined,
        };

        let InFlight { tag, .. } = self.in_flight.take()?;
        if let Err(error) = joined {
            warn!(selection = %tag.key, generation = tag.generation, %error, "discovery task ended without a result");
        }
        let applied = self.drain() > 0;
        if !applied {
            self.abandon_if_pending(&tag);
        }
        Some(applied)
    }

    /// Wait until the current generation finished and apply everything queued.
    pub async fn settle(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            let InFlight { tag, handle } = in_flight;
            if let Err(error) = handle.await {
                warn!(selection = %tag.key, generation = tag.generation, %error, "discovery task ended without a result");
            }
            self.drain();
            self.abandon_if_pending(&tag);
        } else {
            self.drain();
        }
    }

    fn abandon_if_pending(&mut self, tag: &GenerationTag) {
        if self.guard.current() == Some(tag) && self.guard.is_pending() {
            self.guard.settle();
            self.projector.abandon_pending();
        }
    }

    /// Apply queued completions without waiting; returns how many were current.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.completions_rx.try_recv() {
            if self.apply(result) {
                applied += 1;
            }
        }
        applied
    }

    pub fn set_value(&mut self, field: &str, value: Option<String>) -> Result<(), ProjectorError> {
        self.projector.set_value(field, value)
    }

    pub fn validate(&self, field: &str, candidate: Option<&str>) -> Option<String> {
        self.projector.validate(field, candidate)
    }

    pub fn options_for(&self, field: &str) -> Option<&[FieldOption]> {
        self.projector.options_for(field)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.projector.snapshot()
    }

    pub fn current_key(&self) -> Option<&SelectionKey> {
        self.keys.current()
    }

    pub fn current_tag(&self) -> Option<&GenerationTag> {
        self.guard.current()
    }

    pub fn is_pending(&self) -> bool {
        self.guard.is_pending()
    }

    pub fn projector(&self) -> &FormStateProjector<P> {
        &self.projector
    }

    /// Close the form: stop the running task and forget the selection.
    pub fn teardown(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
        self.guard.clear();
        self.keys.clear();
        while self.completions_rx.try_recv().is_ok() {}
        self.projector.teardown();
        debug!("session torn down");
    }
}

impl<P: FormProfile> Drop for DiscoverySession<P> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}
