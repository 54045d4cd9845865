//! Reader-writer lock with writer-starvation avoidance.
//!
//! Any number of readers may hold the lock at once; a writer holds it alone.
//! A reader that arrives while a writer is waiting queues behind that writer.
//! When a writer releases, the readers already queued at that instant are let
//! in as one batch before the next writer, so neither side starves.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    active_readers: usize,
    writer_active: bool,
    waiting_readers: usize,
    waiting_writers: usize,
    /// Readers still allowed past waiting writers after the last write release.
    read_grant: usize,
}

pub struct ReadWriteLock<T> {
    state: Mutex<LockState>,
    readers: Condvar,
    writers: Condvar,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is mediated by `state`; shared references are only
// handed out while no writer is active and the exclusive reference only while
// there are no readers and no other writer.
unsafe impl<T: Send> Send for ReadWriteLock<T> {}
unsafe impl<T: Send + Sync> Sync for ReadWriteLock<T> {}

impl<T> ReadWriteLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire shared access. The lock is released when the guard drops.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        state.waiting_readers += 1;
        while state.writer_active || (state.waiting_writers > 0 && state.read_grant == 0) {
            self.readers.wait(&mut state);
        }
        state.waiting_readers -= 1;
        if state.read_grant > 0 {
            state.read_grant -= 1;
        }
        state.active_readers += 1;
        ReadGuard { lock: self }
    }

    /// Acquire exclusive access. The lock is released when the guard drops.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        state.waiting_writers += 1;
        while state.writer_active || state.active_readers > 0 || state.read_grant > 0 {
            self.writers.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.writer_active = true;
        WriteGuard { lock: self }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Mutable access without locking; the borrow checker proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        state.active_readers -= 1;
        if state.active_readers == 0 && state.read_grant == 0 && state.waiting_writers > 0 {
            self.writers.notify_one();
        }
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        state.writer_active = false;
        if state.waiting_readers > 0 {
            state.read_grant = state.waiting_readers;
            self.readers.notify_all();
        } else if state.waiting_writers > 0 {
            self.writers.notify_one();
        }
    }
}

impl<T: Default> Default for ReadWriteLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for ReadWriteLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReadWriteLock")
            .field("active_readers", &state.active_readers)
            .field("writer_active", &state.writer_active)
            .field("waiting_writers", &state.waiting_writers)
            .finish_non_exhaustive()
    }
}

pub struct ReadGuard<'a, T> {
    lock: &'a ReadWriteLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a read guard exists only while no writer is active.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

pub struct WriteGuard<'a, T> {
    lock: &'a ReadWriteLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write guard is the only live accessor.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write guard is the only live accessor.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
