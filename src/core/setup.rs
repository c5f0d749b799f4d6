//! Binding handlers and processors to threads or the application
//!
//! This module provides:
//! - `StackedObject`: push/pop on the application or thread stack
//! - `ThreadBound` / `ApplicationBound`: RAII guards that pop on drop
//! - `NestedSetup`: several stacked objects bound and unbound together

use super::error::Result;
use super::handler::{Handler, HANDLER_STACK};
use super::processor::{Processor, PROCESSOR_STACK};
use std::marker::PhantomData;
use std::sync::Arc;

/// An object that can be pushed onto and popped from the context stacks
pub trait StackedObject: Send + Sync {
    fn push_thread(&self);

    fn pop_thread(&self) -> Result<()>;

    fn push_application(&self);

    fn pop_application(&self) -> Result<()>;

    /// Binds to the calling thread until the guard is dropped
    fn threadbound(&self) -> ThreadBound<'_, Self>
    where
        Self: Sized,
    {
        self.push_thread();
        ThreadBound {
            object: self,
            popped: false,
            _not_send: PhantomData,
        }
    }

    /// Binds to the whole application until the guard is dropped
    fn applicationbound(&self) -> ApplicationBound<'_, Self>
    where
        Self: Sized,
    {
        self.push_application();
        ApplicationBound {
            object: self,
            popped: false,
        }
    }
}

/// Guard returned by [`StackedObject::threadbound`].
///
/// Not `Send`: it must be dropped on the thread whose stack it modified.
#[must_use = "the object is unbound as soon as the guard is dropped"]
pub struct ThreadBound<'a, S: StackedObject> {
    object: &'a S,
    popped: bool,
    _not_send: PhantomData<*const ()>,
}

impl<S: StackedObject> ThreadBound<'_, S> {
    /// Unbinds now, reporting pop errors instead of printing them
    pub fn pop(mut self) -> Result<()> {
        self.popped = true;
        self.object.pop_thread()
    }
}

impl<S: StackedObject> Drop for ThreadBound<'_, S> {
    fn drop(&mut self) {
        if !self.popped {
            if let Err(e) = self.object.pop_thread() {
                eprintln!("[LOGBOOK WARNING] Failed to unbind from thread stack: {}", e);
            }
        }
    }
}

/// Guard returned by [`StackedObject::applicationbound`]
#[must_use = "the object is unbound as soon as the guard is dropped"]
pub struct ApplicationBound<'a, S: StackedObject> {
    object: &'a S,
    popped: bool,
}

impl<S: StackedObject> ApplicationBound<'_, S> {
    /// Unbinds now, reporting pop errors instead of printing them
    pub fn pop(mut self) -> Result<()> {
        self.popped = true;
        self.object.pop_application()
    }
}

impl<S: StackedObject> Drop for ApplicationBound<'_, S> {
    fn drop(&mut self) {
        if !self.popped {
            if let Err(e) = self.object.pop_application() {
                eprintln!(
                    "[LOGBOOK WARNING] Failed to unbind from application stack: {}",
                    e
                );
            }
        }
    }
}

impl StackedObject for Arc<dyn Handler> {
    fn push_thread(&self) {
        HANDLER_STACK.push_thread(Arc::clone(self));
    }

    fn pop_thread(&self) -> Result<()> {
        HANDLER_STACK.pop_thread(self)?;
        self.on_pop()
    }

    fn push_application(&self) {
        HANDLER_STACK.push_application(Arc::clone(self));
    }

    fn pop_application(&self) -> Result<()> {
        HANDLER_STACK.pop_application(self)?;
        self.on_pop()
    }
}

impl StackedObject for Arc<Processor> {
    fn push_thread(&self) {
        PROCESSOR_STACK.push_thread(Arc::clone(self));
    }

    fn pop_thread(&self) -> Result<()> {
        PROCESSOR_STACK.pop_thread(self)
    }

    fn push_application(&self) {
        PROCESSOR_STACK.push_application(Arc::clone(self));
    }

    fn pop_application(&self) -> Result<()> {
        PROCESSOR_STACK.pop_application(self)
    }
}

/// Configures several handlers and processors at once.
///
/// Objects are pushed in order and popped in reverse order.
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let setup = NestedSetup::new()
///     .with(NullHandler::new().into_shared())
///     .with(TestHandler::new().into_shared())
///     .with(Processor::new(|r: &mut LogRecord| { r.extra.insert("job", 7); }));
///
/// let _bound = setup.threadbound();
/// ```
#[derive(Default)]
pub struct NestedSetup {
    objects: Vec<Box<dyn StackedObject>>,
}

impl NestedSetup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<S: StackedObject + 'static>(mut self, object: S) -> Self {
        self.objects.push(Box::new(object));
        self
    }

    pub fn push(&mut self, object: impl StackedObject + 'static) {
        self.objects.push(Box::new(object));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl StackedObject for NestedSetup {
    fn push_thread(&self) {
        for object in &self.objects {
            object.push_thread();
        }
    }

    /// Pops every object even if one fails; the first error is returned
    fn pop_thread(&self) -> Result<()> {
        let mut first_error = None;
        for object in self.objects.iter().rev() {
            if let Err(e) = object.pop_thread() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn push_application(&self) {
        for object in &self.objects {
            object.push_application();
        }
    }

    fn pop_application(&self) -> Result<()> {
        let mut first_error = None;
        for object in self.objects.iter().rev() {
            if let Err(e) = object.pop_application() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{context_handlers, context_processors, LoggerError};
    use crate::handlers::{NullHandler, TestHandler};
    use crate::HandlerExt;

    #[test]
    fn test_threadbound_guard_pops_on_drop() {
        let handler = TestHandler::new().into_shared();
        {
            let _bound = handler.threadbound();
            assert!(context_handlers().iter().any(|h| Arc::ptr_eq(h, &handler)));
        }
        assert!(!context_handlers().iter().any(|h| Arc::ptr_eq(h, &handler)));
    }

    #[test]
    fn test_explicit_pop_reports_mismatch() {
        let outer = NullHandler::new().into_shared();
        let inner = NullHandler::new().into_shared();

        outer.push_thread();
        inner.push_thread();
        assert!(matches!(outer.pop_thread(), Err(LoggerError::StackMismatch("handler"))));
        inner.pop_thread().unwrap();
        outer.pop_thread().unwrap();
    }

    #[test]
    fn test_nested_setup_pushes_in_order_and_pops_in_reverse() {
        let first = TestHandler::new().into_shared();
        let second = TestHandler::new().into_shared();
        let processor = Processor::noop();
        let setup = NestedSetup::new()
            .with(Arc::clone(&first))
            .with(Arc::clone(&second))
            .with(Arc::clone(&processor));
        assert_eq!(setup.len(), 3);

        let bound = setup.threadbound();
        let handlers = context_handlers();
        let position = |h: &Arc<dyn Handler>| handlers.iter().position(|x| Arc::ptr_eq(x, h));
        assert!(position(&second) < position(&first));
        assert_eq!(context_processors().len(), 1);

        bound.pop().unwrap();
        assert!(position(&first).is_some());
        assert!(context_handlers().is_empty());
        assert!(context_processors().is_empty());
    }
}
