//! Generation bookkeeping for a discovery session.
//!
//! Every run is tagged with the selection key and a generation number that
//! only ever grows. A completion is applied only if its tag is exactly the
//! current one, so a late result for an earlier selection is dropped even when
//! the user has since reselected that same key.

use fieldscout_types::{DiscoveryResult, GenerationTag, SelectionKey};
use tracing::debug;

/// What [`StalenessGuard::begin`] decided for a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// A new run must be started with this tag.
    Started(GenerationTag),
    /// The same key is already being discovered; its run stays valid.
    Joined(GenerationTag),
}

impl BeginOutcome {
    pub fn tag(&self) -> &GenerationTag {
        match self {
            BeginOutcome::Started(tag) | BeginOutcome::Joined(tag) => tag,
        }
    }
}

#[derive(Debug, Default)]
pub struct StalenessGuard {
    next_generation: u64,
    current: Option<GenerationTag>,
    in_flight: bool,
}

impl StalenessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, key: SelectionKey) -> BeginOutcome {
        if self.in_flight
            && let Some(current) = &self.current
            && current.key == key
        {
            debug!(selection = %key, generation = current.generation, "selection already in flight");
            return BeginOutcome::Joined(current.clone());
        }

        self.next_generation += 1;
        let tag = GenerationTag::new(key, self.next_generation);
        debug!(selection = %tag.key, generation = tag.generation, "generation started");
        self.current = Some(tag.clone());
        self.in_flight = true;
        BeginOutcome::Started(tag)
    }

    /// Whether `result` belongs to the current generation. Accepting settles it.
    pub fn accept(&mut self, result: &DiscoveryResult) -> bool {
        if !accept(result, self.current.as_ref()) {
            debug!(
                selection = %result.tag.key,
                generation = result.tag.generation,
                current = ?self.current.as_ref().map(ToString::to_string),
                "discarding stale result"
            );
            return false;
        }
        self.in_flight = false;
        true
    }

    pub fn current(&self) -> Option<&GenerationTag> {
        self.current.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
    }

    /// Mark the current run as finished without a result (for example when its task died).
    pub fn settle(&mut self) {
        self.in_flight = false;
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.in_flight = false;
    }
}

/// True only if `result` was produced for `current`.
pub fn accept(result: &DiscoveryResult, current: Option<&GenerationTag>) -> bool {
    current.is_some_and(|current| &result.tag == current)
}
