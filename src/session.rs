//! Evaluation sessions and the slot that exposes the running one to other threads.
//!
//! A [`SessionSlot`] is empty except while an evaluation is in progress. The
//! evaluating thread publishes its [`EvaluationSession`] into the slot before
//! it starts and clears it on every way out, including errors and panics.
//! Publishing and clearing both happen under the slot's mutex, so a monitor
//! sees either no session or a complete one.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Parsing,
    Evaluating,
    Finished,
}

impl SessionPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionPhase::Parsing,
            1 => SessionPhase::Evaluating,
            _ => SessionPhase::Finished,
        }
    }
}

/// The observable state of one in-flight evaluation.
#[derive(Debug)]
pub struct EvaluationSession {
    id: u64,
    expression: String,
    /// Byte offset the parser reached.
    cursor: AtomicUsize,
    phase: AtomicU8,
    interrupt: AtomicBool,
}

impl EvaluationSession {
    pub(crate) fn new(expression: &str) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            expression: expression.to_string(),
            cursor: AtomicUsize::new(0),
            phase: AtomicU8::new(SessionPhase::Parsing as u8),
            interrupt: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Asks the evaluator to stop at its next step or predicate.
    pub fn request_abort(&self) {
        self.interrupt.store(true, Ordering::Release);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }

    pub(crate) fn interrupt_flag(&self) -> &AtomicBool {
        &self.interrupt
    }

    pub(crate) fn advance(&self, cursor: usize, phase: SessionPhase) {
        self.cursor.store(cursor, Ordering::Release);
        self.phase.store(phase as u8, Ordering::Release);
    }
}

/// A shareable handle to the session currently evaluating, if any.
///
/// Clones share the same slot: hand one to a monitoring thread and it can
/// watch, and abort, evaluations that run through the original.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    current: Arc<Mutex<Option<Arc<EvaluationSession>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded value is a plain Option, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Option<Arc<EvaluationSession>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Arc<EvaluationSession>> {
        self.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Requests that the running evaluation stop. Returns false when the slot is empty.
    pub fn abort_current(&self) -> bool {
        match self.current() {
            Some(session) => {
                log::debug!("Abort requested for session {}", session.id);
                session.request_abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn publish(&self, session: Arc<EvaluationSession>) -> PublishedSession<'_> {
        let mut slot = self.lock();
        if let Some(stale) = slot.replace(Arc::clone(&session)) {
            log::warn!(
                "Session slot still held session {} ('{}') when session {} started",
                stale.id,
                stale.expression,
                session.id
            );
        }
        log::debug!("Published session {} for '{}'", session.id, session.expression);
        PublishedSession {
            slot: self,
            session,
        }
    }
}

/// Keeps a session published for as long as it lives.
pub(crate) struct PublishedSession<'s> {
    slot: &'s SessionSlot,
    session: Arc<EvaluationSession>,
}

impl PublishedSession<'_> {
    pub(crate) fn session(&self) -> &EvaluationSession {
        &self.session
    }
}

impl Drop for PublishedSession<'_> {
    fn drop(&mut self) {
        let cursor = self.session.cursor();
        self.session.advance(cursor, SessionPhase::Finished);
        let mut slot = self.slot.lock();
        // Another evaluation may have taken the slot over; leave that one alone.
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, &self.session)) {
            *slot = None;
            log::debug!("Cleared session {}", self.session.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_clear() {
        let slot = SessionSlot::new();
        assert!(!slot.is_active());
        {
            let published = slot.publish(Arc::new(EvaluationSession::new("//entry")));
            let current = slot.current().unwrap();
            assert_eq!(current.expression(), "//entry");
            assert_eq!(current.id(), published.session().id());
            assert_eq!(current.phase(), SessionPhase::Parsing);
        }
        assert!(!slot.is_active());
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = SessionSlot::new();
        let monitor = slot.clone();
        let published = slot.publish(Arc::new(EvaluationSession::new("//orth")));
        assert!(monitor.is_active());

        assert!(monitor.abort_current());
        assert!(published.session().is_abort_requested());
        drop(published);
        assert!(!monitor.abort_current());
    }

    #[test]
    fn test_drop_keeps_newer_session() {
        let slot = SessionSlot::new();
        let first = slot.publish(Arc::new(EvaluationSession::new("first")));
        let second = slot.publish(Arc::new(EvaluationSession::new("second")));
        drop(first);
        assert_eq!(slot.current().unwrap().expression(), "second");
        drop(second);
        assert!(!slot.is_active());
    }

    #[test]
    fn test_session_finishes_when_cleared() {
        let slot = SessionSlot::new();
        let session = Arc::new(EvaluationSession::new("//tr"));
        let published = slot.publish(Arc::clone(&session));
        session.advance(4, SessionPhase::Evaluating);
        assert_eq!(slot.current().unwrap().phase(), SessionPhase::Evaluating);
        drop(published);
        assert_eq!(session.phase(), SessionPhase::Finished);
        assert_eq!(session.cursor(), 4);
    }

    #[test]
    fn test_poisoned_slot_is_still_usable() {
        let slot = SessionSlot::new();
        let poisoner = slot.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.current.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(!slot.is_active());
        let published = slot.publish(Arc::new(EvaluationSession::new("//pos")));
        assert!(slot.is_active());
        drop(published);
        assert!(!slot.is_active());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = EvaluationSession::new("a");
        let b = EvaluationSession::new("b");
        assert_ne!(a.id(), b.id());
    }
}
