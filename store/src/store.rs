use crate::model::{initial_table, CameraReadingTable};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

/// Store holding the camera reading table
pub type CameraStore = Store<CameraReadingTable>;

/// Creates a store seeded with the two initial cameras.
pub fn camera_store() -> CameraStore {
    Store::new(initial_table())
}

type Callback<T> = dyn Fn(&T) + Send + Sync;

struct Observer<T> {
    id: u64,
    active: AtomicBool,
    callback: Box<Callback<T>>,
}

struct State<T> {
    value: Arc<T>,
    observers: Vec<Arc<Observer<T>>>,
    next_id: u64,
}

/// A value and the observers registered when it was written.
struct Round<T> {
    value: Arc<T>,
    observers: Vec<Arc<Observer<T>>>,
}

/// Thread currently delivering notifications, and the rounds it still owes.
struct Rounds<T> {
    owner: Option<ThreadId>,
    queued: VecDeque<Round<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    gate: Mutex<()>,
    rounds: Mutex<Rounds<T>>,
}

/// Observable value: holds a `T` and calls every subscribed observer, in
/// subscription order, each time the value is replaced.
///
/// Cloning gives another handle to the same store. Writes and subscriptions
/// from different threads are serialized, so observers see changes in the
/// order they were applied. An observer may write to the store it observes;
/// the nested change is applied at once and its notification round is
/// delivered after the current round completes.
pub struct Store<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: Arc::new(value),
                    observers: Vec::new(),
                    next_id: 0,
                }),
                gate: Mutex::new(()),
                rounds: Mutex::new(Rounds {
                    owner: None,
                    queued: VecDeque::new(),
                }),
            }),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&lock(&self.shared.state).value)
    }

    /// Replaces the value and notifies every observer before returning.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Replaces the value with `f(current)` and notifies every observer before
    /// returning. No other write can land between the read and the replacement.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.exclusive(|shared| {
            let current = Arc::clone(&lock(&shared.state).value);
            let next = Arc::new(f(&*current));

            let round = {
                let mut state = lock(&shared.state);
                state.value = Arc::clone(&next);
                Round {
                    value: next,
                    observers: state.observers.clone(),
                }
            };
            lock(&shared.rounds).queued.push_back(round);
        });
    }

    /// Registers `observer` and calls it once with the current value before
    /// returning. Later changes reach it until the returned handle is unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.exclusive(|shared| {
            let (observer, current) = {
                let mut state = lock(&shared.state);
                let id = state.next_id;
                state.next_id += 1;

                let observer = Arc::new(Observer {
                    id,
                    active: AtomicBool::new(true),
                    callback: Box::new(observer),
                });
                state.observers.push(Arc::clone(&observer));
                (observer, Arc::clone(&state.value))
            };

            debug!("Observer {} subscribed", observer.id);

            // Deregisters the observer if its first call panics
            let mut pending = PendingObserver {
                shared,
                id: observer.id,
                armed: true,
            };
            (observer.callback)(&*current);
            pending.armed = false;

            Subscription {
                id: observer.id,
                shared: Arc::downgrade(&self.shared),
            }
        })
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        lock(&self.shared.state).observers.len()
    }

    /// Runs `op` while holding the write gate, then delivers every round queued
    /// by it (or by observers reacting to it). Calls made from inside a round
    /// on the delivering thread run directly and leave delivery to the outer call.
    fn exclusive<R>(&self, op: impl FnOnce(&Shared<T>) -> R) -> R {
        let shared = &*self.shared;

        if shared.delivering_on_current_thread() {
            return op(shared);
        }

        let _round = RoundGuard::enter(shared);
        let result = op(shared);

        loop {
            let next = lock(&shared.rounds).queued.pop_front();
            let Some(round) = next else { break };
            round.deliver();
        }

        result
    }
}

impl<T> Shared<T> {
    fn delivering_on_current_thread(&self) -> bool {
        lock(&self.rounds).owner == Some(thread::current().id())
    }

    fn remove_observer(&self, id: u64) -> bool {
        let mut state = lock(&self.state);
        match state.observers.iter().position(|o| o.id == id) {
            Some(pos) => {
                let observer = state.observers.remove(pos);
                observer.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }
}

impl<T> Round<T> {
    fn deliver(self) {
        trace!("Notifying {} observers", self.observers.len());

        for observer in self.observers {
            if observer.active.load(Ordering::Acquire) {
                (observer.callback)(&*self.value);
            }
        }
    }
}

struct PendingObserver<'a, T> {
    shared: &'a Shared<T>,
    id: u64,
    armed: bool,
}

impl<T> Drop for PendingObserver<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.remove_observer(self.id);
        }
    }
}

/// Holds the write gate and marks the current thread as the one delivering
/// notification rounds.
struct RoundGuard<'a, T> {
    shared: &'a Shared<T>,
    _gate: MutexGuard<'a, ()>,
}

impl<'a, T> RoundGuard<'a, T> {
    fn enter(shared: &'a Shared<T>) -> Self {
        let gate = lock(&shared.gate);
        lock(&shared.rounds).owner = Some(thread::current().id());
        Self {
            shared,
            _gate: gate,
        }
    }
}

impl<T> Drop for RoundGuard<'_, T> {
    fn drop(&mut self) {
        let mut rounds = lock(&self.shared.rounds);
        rounds.owner = None;
        // Only non-empty if an observer panicked mid-round
        rounds.queued.clear();
    }
}

/// Handle returned by [`Store::subscribe`].
#[must_use = "dropping a Subscription keeps the observer registered; call `unsubscribe` to remove it"]
pub struct Subscription<T> {
    id: u64,
    shared: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Permanently removes the observer. It is not called again, even by a
    /// round already being delivered on another thread.
    pub fn unsubscribe(self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        if shared.remove_observer(self.id) {
            debug!("Observer {} unsubscribed", self.id);
        }
    }
}

/// Locks `mutex`, ignoring poison left behind by a panicking observer.
fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
