//! Logger groups share a level, a disabled flag and a processor

use super::error::{LoggerError, Result};
use super::level::Level;
use super::logger::{Logger, LoggerInner};
use super::processor::ProcessorFn;
use super::record::LogRecord;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

struct GroupInner {
    // Loggers hold the group strongly, so the group only keeps weak links
    loggers: RwLock<Vec<Weak<LoggerInner>>>,
    level: AtomicU8,
    disabled: AtomicBool,
    processor: RwLock<Option<ProcessorFn>>,
}

/// A set of loggers configured together.
///
/// A logger in a group falls back to the group's level when its own level
/// is `NotSet`, and to the group's disabled flag when it has none of its
/// own. The group processor runs before the context processors.
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let group = LoggerGroup::new().with_level(Level::Warning);
/// let db = Logger::new("db");
/// group.add_logger(&db).unwrap();
/// assert_eq!(db.level(), Level::Warning);
///
/// group.remove_logger(&db).unwrap();
/// assert_eq!(db.level(), Level::NotSet);
/// ```
#[derive(Clone)]
pub struct LoggerGroup {
    inner: Arc<GroupInner>,
}

impl LoggerGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GroupInner {
                loggers: RwLock::new(Vec::new()),
                level: AtomicU8::new(Level::NotSet as u8),
                disabled: AtomicBool::new(false),
                processor: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn with_level(self, level: Level) -> Self {
        self.set_level(level);
        self
    }

    #[must_use]
    pub fn with_processor<F>(self, processor: F) -> Self
    where
        F: Fn(&mut LogRecord) + Send + Sync + 'static,
    {
        self.set_processor(Some(Arc::new(processor)));
        self
    }

    /// Adds the given loggers to the group
    pub fn with_loggers<'a>(self, loggers: impl IntoIterator<Item = &'a Logger>) -> Result<Self> {
        for logger in loggers {
            self.add_logger(logger)?;
        }
        Ok(self)
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.inner.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_level(&self, level: Level) {
        self.inner.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn disabled(&self) -> bool {
        self.inner.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.set_disabled(true);
    }

    pub fn enable(&self) {
        self.set_disabled(false);
    }

    pub fn set_processor(&self, processor: Option<ProcessorFn>) {
        *self.inner.processor.write() = processor;
    }

    /// # Errors
    ///
    /// Returns `AlreadyInGroup` if the logger belongs to a group already.
    pub fn add_logger(&self, logger: &Logger) -> Result<()> {
        if !logger.join_group(self) {
            return Err(LoggerError::AlreadyInGroup(display_name(logger)));
        }
        let mut loggers = self.inner.loggers.write();
        loggers.retain(|weak| weak.strong_count() > 0);
        loggers.push(logger.downgrade());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotInGroup` if the logger is not a member of this group.
    pub fn remove_logger(&self, logger: &Logger) -> Result<()> {
        let mut loggers = self.inner.loggers.write();
        let target = Arc::as_ptr(logger.inner());
        let position = loggers
            .iter()
            .position(|weak| std::ptr::eq(weak.as_ptr(), target))
            .ok_or_else(|| LoggerError::NotInGroup(display_name(logger)))?;
        loggers.remove(position);
        drop(loggers);

        logger.set_group(None);
        Ok(())
    }

    /// Live members of the group, in insertion order
    pub fn loggers(&self) -> Vec<Logger> {
        let mut loggers = self.inner.loggers.write();
        loggers.retain(|weak| weak.strong_count() > 0);
        loggers
            .iter()
            .filter_map(Weak::upgrade)
            .map(Logger::from_inner)
            .collect()
    }

    pub fn contains(&self, logger: &Logger) -> bool {
        let target = Arc::as_ptr(logger.inner());
        self.inner
            .loggers
            .read()
            .iter()
            .any(|weak| std::ptr::eq(weak.as_ptr(), target))
    }

    /// Runs the group processor, if any
    pub fn process_record(&self, record: &mut LogRecord) {
        let processor = self.inner.processor.read().clone();
        if let Some(processor) = processor {
            processor(record);
        }
    }
}

impl Default for LoggerGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerGroup")
            .field("level", &self.level())
            .field("disabled", &self.disabled())
            .field("loggers", &self.inner.loggers.read().len())
            .finish()
    }
}

fn display_name(logger: &Logger) -> String {
    logger.name().unwrap_or("<unnamed>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_is_inherited_unless_set() {
        let group = LoggerGroup::new().with_level(Level::Error);
        let inherits = Logger::new("inherits");
        let own = Logger::builder().name("own").level(Level::Debug).build();
        group.add_logger(&inherits).unwrap();
        group.add_logger(&own).unwrap();

        assert_eq!(inherits.level(), Level::Error);
        assert_eq!(own.level(), Level::Debug);

        group.set_level(Level::Critical);
        assert_eq!(inherits.level(), Level::Critical);
    }

    #[test]
    fn test_disabled_is_inherited_unless_set() {
        let group = LoggerGroup::new();
        let inherits = Logger::new("inherits");
        let own = Logger::builder().name("own").disabled(false).build();
        group.add_logger(&inherits).unwrap();
        group.add_logger(&own).unwrap();

        group.disable();
        assert!(inherits.disabled());
        assert!(!own.disabled());

        inherits.enable();
        assert!(!inherits.disabled());
        inherits.reset_disabled();
        assert!(inherits.disabled());
    }

    #[test]
    fn test_membership_errors() {
        let first = LoggerGroup::new();
        let second = LoggerGroup::new();
        let logger = Logger::new("member");

        first.add_logger(&logger).unwrap();
        assert!(matches!(
            second.add_logger(&logger),
            Err(LoggerError::AlreadyInGroup(name)) if name == "member"
        ));
        assert!(matches!(
            second.remove_logger(&logger),
            Err(LoggerError::NotInGroup(_))
        ));

        first.remove_logger(&logger).unwrap();
        assert!(logger.group().is_none());
        second.add_logger(&logger).unwrap();
        assert!(second.contains(&logger));
    }

    #[test]
    fn test_dropped_loggers_leave_the_group() {
        let group = LoggerGroup::new();
        {
            let temporary = Logger::new("temporary");
            group.add_logger(&temporary).unwrap();
            assert_eq!(group.loggers().len(), 1);
        }
        assert!(group.loggers().is_empty());
    }

    #[test]
    fn test_group_processor() {
        let group = LoggerGroup::new().with_processor(|record| {
            record.extra.insert("group", "payments");
        });
        let mut record = LogRecord::new(None, Level::Info, "charge");
        group.process_record(&mut record);
        assert_eq!(record.extra.get("group").as_str(), Some("payments"));
    }

    #[test]
    fn test_concurrent_add_joins_exactly_one_group() {
        for _ in 0..50 {
            let logger = Logger::new("contested");
            let groups: Vec<LoggerGroup> = (0..4).map(|_| LoggerGroup::new()).collect();
            let barrier = std::sync::Barrier::new(groups.len());

            let joined = std::thread::scope(|scope| {
                let handles: Vec<_> = groups
                    .iter()
                    .map(|group| {
                        let logger = &logger;
                        let barrier = &barrier;
                        scope.spawn(move || {
                            barrier.wait();
                            group.add_logger(logger).is_ok()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join())
                    .filter(|r| matches!(r, Ok(true)))
                    .count()
            });

            assert_eq!(joined, 1);
            let members: usize = groups.iter().map(|g| g.loggers().len()).sum();
            assert_eq!(members, 1);
            let owner = logger.group().unwrap();
            assert!(owner.contains(&logger));
        }
    }
}
