//! Application and thread stacks of context objects
//!
//! Handlers and processors are not attached to loggers globally. Instead
//! they are pushed onto one of two stacks:
//! - the application stack, visible from every thread
//! - the thread stack of the pushing thread, visible only there
//!
//! Every push draws a number from one counter shared by both stacks, so the
//! merged view can be ordered by push time: most recently pushed first.

use super::error::{LoggerError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Maximum number of per-thread merged views kept before the cache is reset
pub const MAX_CONTEXT_OBJECT_CACHE: usize = 256;

type Entry<T> = (u64, Arc<T>);

struct StackState<T: ?Sized> {
    application: Vec<Entry<T>>,
    threads: HashMap<ThreadId, Vec<Entry<T>>>,
    cache: HashMap<ThreadId, Arc<[Arc<T>]>>,
}

/// Registry of stacked objects of one kind
pub struct ContextStack<T: ?Sized> {
    kind: &'static str,
    state: Mutex<StackState<T>>,
    stackop: AtomicU64,
}

fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl<T: ?Sized> ContextStack<T> {
    /// `kind` names the stack in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            state: Mutex::new(StackState {
                application: Vec::new(),
                threads: HashMap::new(),
                cache: HashMap::new(),
            }),
            stackop: AtomicU64::new(0),
        }
    }

    fn next_stackop(&self) -> u64 {
        self.stackop.fetch_add(1, Ordering::Relaxed)
    }

    /// Pushes `object` onto the calling thread's stack
    pub fn push_thread(&self, object: Arc<T>) {
        let tid = thread::current().id();
        let mut state = self.state.lock();
        state.cache.remove(&tid);
        let item = (self.next_stackop(), object);
        state.threads.entry(tid).or_default().push(item);
    }

    /// Pops `object` from the calling thread's stack.
    ///
    /// # Errors
    ///
    /// `EmptyStack` if the thread has nothing pushed, `StackMismatch` if
    /// the top of the stack is a different object. The stack is left
    /// untouched on mismatch.
    pub fn pop_thread(&self, object: &Arc<T>) -> Result<()> {
        let tid = thread::current().id();
        let mut state = self.state.lock();
        state.cache.remove(&tid);
        let stack = state
            .threads
            .get_mut(&tid)
            .filter(|s| !s.is_empty())
            .ok_or(LoggerError::EmptyStack(self.kind))?;

        match stack.last() {
            Some((_, top)) if same_object(top, object) => {
                stack.pop();
            }
            _ => return Err(LoggerError::StackMismatch(self.kind)),
        }
        if stack.is_empty() {
            state.threads.remove(&tid);
        }
        Ok(())
    }

    /// Pushes `object` onto the application stack
    pub fn push_application(&self, object: Arc<T>) {
        let mut state = self.state.lock();
        let item = (self.next_stackop(), object);
        state.application.push(item);
        state.cache.clear();
    }

    /// Pops `object` from the application stack.
    ///
    /// # Errors
    ///
    /// Same conditions as [`pop_thread`](ContextStack::pop_thread).
    pub fn pop_application(&self, object: &Arc<T>) -> Result<()> {
        let mut state = self.state.lock();
        state.cache.clear();
        match state.application.last() {
            None => Err(LoggerError::EmptyStack(self.kind)),
            Some((_, top)) if same_object(top, object) => {
                state.application.pop();
                Ok(())
            }
            Some(_) => Err(LoggerError::StackMismatch(self.kind)),
        }
    }

    /// All objects visible from the calling thread, most recently pushed
    /// first
    pub fn iter_context_objects(&self) -> Arc<[Arc<T>]> {
        let tid = thread::current().id();
        let mut state = self.state.lock();
        if let Some(objects) = state.cache.get(&tid) {
            return Arc::clone(objects);
        }
        if state.cache.len() > MAX_CONTEXT_OBJECT_CACHE {
            state.cache.clear();
        }

        let mut merged: Vec<&Entry<T>> = state.application.iter().collect();
        if let Some(stack) = state.threads.get(&tid) {
            merged.extend(stack.iter());
        }
        merged.sort_by(|a, b| b.0.cmp(&a.0));
        let objects: Arc<[Arc<T>]> = merged.into_iter().map(|(_, o)| Arc::clone(o)).collect();

        state.cache.insert(tid, Arc::clone(&objects));
        objects
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of objects on the application stack
    pub fn application_len(&self) -> usize {
        self.state.lock().application.len()
    }

    /// Number of objects on the calling thread's stack
    pub fn thread_len(&self) -> usize {
        let tid = thread::current().id();
        self.state.lock().threads.get(&tid).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(stack: &ContextStack<str>) -> Vec<String> {
        stack
            .iter_context_objects()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_most_recent_push_comes_first() {
        let stack: ContextStack<str> = ContextStack::new("test");
        let a: Arc<str> = Arc::from("a");
        let b: Arc<str> = Arc::from("b");
        let c: Arc<str> = Arc::from("c");

        stack.push_application(Arc::clone(&a));
        stack.push_thread(Arc::clone(&b));
        stack.push_application(Arc::clone(&c));

        assert_eq!(names(&stack), vec!["c", "b", "a"]);

        stack.pop_application(&c).unwrap();
        assert_eq!(names(&stack), vec!["b", "a"]);
    }

    #[test]
    fn test_thread_stack_is_private() {
        let stack: Arc<ContextStack<str>> = Arc::new(ContextStack::new("test"));
        let local: Arc<str> = Arc::from("local");
        stack.push_thread(Arc::clone(&local));

        let other = Arc::clone(&stack);
        let seen = thread::spawn(move || other.iter_context_objects().len())
            .join()
            .unwrap();
        assert_eq!(seen, 0);
        assert_eq!(stack.iter_context_objects().len(), 1);
    }

    #[test]
    fn test_pop_errors() {
        let stack: ContextStack<str> = ContextStack::new("handler");
        let a: Arc<str> = Arc::from("a");
        let b: Arc<str> = Arc::from("b");

        assert!(matches!(stack.pop_thread(&a), Err(LoggerError::EmptyStack("handler"))));
        assert!(matches!(stack.pop_application(&a), Err(LoggerError::EmptyStack(_))));

        stack.push_thread(Arc::clone(&a));
        stack.push_thread(Arc::clone(&b));
        assert!(matches!(stack.pop_thread(&a), Err(LoggerError::StackMismatch(_))));
        assert_eq!(stack.thread_len(), 2);

        stack.pop_thread(&b).unwrap();
        stack.pop_thread(&a).unwrap();
        assert_eq!(stack.thread_len(), 0);
    }

    #[test]
    fn test_identity_not_equality() {
        let stack: ContextStack<str> = ContextStack::new("test");
        let first: Arc<str> = Arc::from("same");
        let second: Arc<str> = Arc::from("same");

        stack.push_thread(Arc::clone(&first));
        assert!(stack.pop_thread(&second).is_err());
        assert!(stack.pop_thread(&first).is_ok());
    }

    #[test]
    fn test_cache_is_invalidated_on_push() {
        let stack: ContextStack<str> = ContextStack::new("test");
        let a: Arc<str> = Arc::from("a");
        let b: Arc<str> = Arc::from("b");

        stack.push_thread(Arc::clone(&a));
        let before = stack.iter_context_objects();
        stack.push_thread(Arc::clone(&b));
        let after = stack.iter_context_objects();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
    }
}
