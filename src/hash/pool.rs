//! Reusable resource pool with scoped checkout
//!
//! A [`ResourcePool`] hands out [`Pooled`] guards. Every checkout is reset
//! before the caller sees it, and the guard returns the instance when it is
//! dropped, on success, error and unwinding paths alike. Idle instances above
//! the retention cap are discarded instead of kept.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Pool of reusable instances of `T`
pub struct ResourcePool<T> {
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    reset: Reset<T>,
    max_idle: usize,
    created: AtomicUsize,
    reused: AtomicUsize,
}

impl<T> ResourcePool<T> {
    /// Create a pool that builds instances with `factory` and prepares every
    /// checkout with `reset`.
    pub fn new<F, R>(factory: F, reset: R, max_idle: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            reset: Box::new(reset),
            max_idle,
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        }
    }

    /// Check out an instance, resetting it first
    pub fn acquire(&self) -> Pooled<'_, T> {
        let recycled = self.lock_idle().pop();
        let mut item = match recycled {
            Some(item) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            }
        };
        (self.reset)(&mut item);

        Pooled {
            pool: self,
            item: Some(item),
        }
    }

    fn release(&self, item: T) {
        let mut idle = self.lock_idle();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    // Instances carry no state between checkouts, so a poisoned lock is safe
    // to keep using.
    fn lock_idle(&self) -> MutexGuard<'_, Vec<T>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of idle instances waiting for reuse
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Instances built by the factory so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Checkouts served from idle instances
    pub fn reused(&self) -> usize {
        self.reused.load(Ordering::Relaxed)
    }
}

/// Exclusive checkout from a [`ResourcePool`]
pub struct Pooled<'a, T> {
    pool: &'a ResourcePool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the item out.
        self.item.as_ref().unwrap_or_else(|| unreachable!("pooled item taken before drop"))
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().unwrap_or_else(|| unreachable!("pooled item taken before drop"))
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
