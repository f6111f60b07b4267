//! In-process notification center.
//!
//! Host applications already receive interruption and lifecycle callbacks
//! from their own framework (an `UIApplicationDelegate`, a Flutter or React
//! Native bridge, ...).  Rather than registering a second set of platform
//! observers, the host forwards those callbacks here with [`post`], and every
//! monitor subscribed to the matching [`NotificationKind`] is notified.
//!
//! Tests use the same type to simulate phone calls and app switches.
//!
//! [`post`]: LocalNotificationCenter::post

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;
use uuid::Uuid;

use crate::application::platform::{
    NotificationCenter, NotificationHandler, NotificationKind, ObserverToken, PlatformNotification,
};

/// Broadcast registry keyed by observer token.
#[derive(Default)]
pub struct LocalNotificationCenter {
    observers: Mutex<HashMap<ObserverToken, (NotificationKind, NotificationHandler)>>,
}

impl LocalNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(
        &self,
    ) -> MutexGuard<'_, HashMap<ObserverToken, (NotificationKind, NotificationHandler)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `notification` to every observer of its kind.
    ///
    /// Handlers run synchronously on the caller's thread, outside the
    /// registry lock.  Returns the number of observers notified.
    pub fn post(&self, notification: PlatformNotification) -> usize {
        let kind = notification.kind();
        let handlers: Vec<NotificationHandler> = self
            .observers()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| handler.clone())
            .collect();

        trace!(?notification, observers = handlers.len(), "posting notification");
        for handler in &handlers {
            handler(notification);
        }
        handlers.len()
    }

    /// Total number of registered observers, all kinds.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }
}

impl NotificationCenter for LocalNotificationCenter {
    fn add_observer(&self, kind: NotificationKind, handler: NotificationHandler) -> ObserverToken {
        let token = Uuid::new_v4();
        self.observers().insert(token, (kind, handler));
        token
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.observers().remove(&token);
    }
}
