use crate::ports::{Clock, TimeControl};
use chrono::{DateTime, Duration, Utc};
use std::sync::{PoisonError, RwLock};

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock whose effective time staff can pin to an absolute instant.
///
/// While an override is set time does not advance on its own; staff move it
/// forward explicitly.
#[derive(Debug, Default)]
pub struct OverridableClock<C: Clock = SystemClock> {
    inner: C,
    pinned: RwLock<Option<DateTime<Utc>>>,
}

impl<C: Clock> OverridableClock<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            pinned: RwLock::new(None),
        }
    }
}

impl<C: Clock> Clock for OverridableClock<C> {
    fn now(&self) -> DateTime<Utc> {
        self.current_override().unwrap_or_else(|| self.inner.now())
    }
}

impl<C: Clock> TimeControl for OverridableClock<C> {
    fn real_now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    fn current_override(&self) -> Option<DateTime<Utc>> {
        *self.pinned.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_override(&self, at: DateTime<Utc>) {
        *self.pinned.write().unwrap_or_else(PoisonError::into_inner) = Some(at);
    }

    fn clear_override(&self) {
        *self.pinned.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Manually driven clock for tests and demos
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(at),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
