use std::{collections::HashMap, future::Future, num::NonZeroUsize};

use tokio::task::{Id, JoinError, JoinSet};

/// Spawns every `(key, future)` pair onto a [`JoinSet`] and folds the results
/// as they complete.
///
/// With a `capacity`, at most that many futures run at once and the next one
/// is spawned each time a running one finishes. Every key reaches `fold_with`
/// exactly once: with the future's output, or with the [`JoinError`] when the
/// task panicked or was cancelled.
pub async fn join_keyed<Iterable, Key, Fut, Accumulator, FoldWith>(
    iterable: Iterable,
    accumulator: Accumulator,
    fold_with: FoldWith,
    capacity: Option<NonZeroUsize>,
) -> Accumulator
where
    Iterable: IntoIterator<Item = (Key, Fut)>,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
    FoldWith: FnMut(Accumulator, Key, Result<Fut::Output, JoinError>) -> Accumulator,
{
    let mut iter = iterable.into_iter().fuse();
    let mut keyed = KeyedSet {
        set: JoinSet::new(),
        keys: HashMap::new(),
    };

    match capacity {
        Some(capacity) => {
            for (key, future) in (&mut iter).take(capacity.get()) {
                keyed.spawn(key, future);
            }
        },
        None => {
            for (key, future) in &mut iter {
                keyed.spawn(key, future);
            }
        },
    }

    keyed
        .fold(accumulator, fold_with, |keyed| {
            if let Some((key, future)) = iter.next() {
                keyed.spawn(key, future);
            }
        })
        .await
}

struct KeyedSet<Key, Output> {
    set: JoinSet<Output>,
    keys: HashMap<Id, Key>,
}

impl<Key, Output> KeyedSet<Key, Output>
where
    Output: Send + 'static,
{
    fn spawn<Fut>(&mut self, key: Key, future: Fut)
    where
        Fut: Future<Output = Output> + Send + 'static,
    {
        let handle = self.set.spawn(future);
        self.keys.insert(handle.id(), key);
    }

    async fn fold<Accumulator, FoldWith, AfterFold>(
        mut self,
        mut accumulator: Accumulator,
        mut fold_with: FoldWith,
        mut after_fold: AfterFold,
    ) -> Accumulator
    where
        FoldWith: FnMut(Accumulator, Key, Result<Output, JoinError>) -> Accumulator,
        AfterFold: FnMut(&mut Self),
    {
        while let Some(result) = self.set.join_next_with_id().await {
            let (id, result) = match result {
                Ok((id, output)) => (id, Ok(output)),
                Err(error) => (error.id(), Err(error)),
            };

            if let Some(key) = self.keys.remove(&id) {
                accumulator = fold_with(accumulator, key, result);
            }

            after_fold(&mut self);
        }

        accumulator
    }
}
