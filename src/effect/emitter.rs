use std::sync::Arc;

/// Handle an effect uses to feed actions back into its store.
///
/// Every emitted action goes through the store's queue, so it is serialized
/// with all other action processing. `emit` returns `false` once the effect
/// has been cancelled or the store is gone; producers should stop then.
pub struct Emitter<A> {
    sink: Arc<dyn Fn(A) -> bool + Send + Sync>,
}

impl<A: 'static> Emitter<A> {
    pub fn new(sink: impl Fn(A) -> bool + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn emit(&self, action: A) -> bool {
        (self.sink)(action)
    }

    /// Emitter for a child action type that wraps every action with `embed`.
    pub fn embedding<C: 'static>(
        &self,
        embed: Arc<dyn Fn(C) -> A + Send + Sync>,
    ) -> Emitter<C> {
        let sink = Arc::clone(&self.sink);
        Emitter {
            sink: Arc::new(move |action: C| sink(embed(action))),
        }
    }
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}
