//! Revocable listener registrations.
//!
//! Each resource bound to the engine gets one [`ListenerRegistration`]. Every
//! sink created from it shares a single cancellation token and tags its
//! events with the registration's instance number, so revoking the
//! registration silences all of that resource's callbacks in one step and the
//! engine can still recognise anything already queued as stale.

use bridge_traits::{ResourceEvent, ResourceEventSink};
use core_async::sync::CancellationToken;

/// Monotonic number identifying one binding of one resource.
pub type InstanceId = u64;

#[derive(Debug)]
pub struct ListenerRegistration {
    instance: InstanceId,
    token: CancellationToken,
}

impl ListenerRegistration {
    pub fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            token: CancellationToken::new(),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Sink that forwards events tagged with this registration's instance.
    pub fn sink<F>(&self, deliver: F) -> ResourceEventSink
    where
        F: Fn(InstanceId, ResourceEvent) + Send + Sync + 'static,
    {
        let instance = self.instance;
        ResourceEventSink::new(self.token.clone(), move |event| deliver(instance, event))
    }

    pub fn revoke(&self) {
        self.token.cancel();
    }

    pub fn is_revoked(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn revoke_silences_every_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registration = ListenerRegistration::new(4);

        let log = seen.clone();
        let first = registration.sink(move |instance, event| log.lock().push((instance, event)));
        let log = seen.clone();
        let second = registration.sink(move |instance, event| log.lock().push((instance, event)));

        assert!(first.emit(ResourceEvent::Playing));
        registration.revoke();
        assert!(!first.emit(ResourceEvent::Ended));
        assert!(!second.emit(ResourceEvent::Ended));

        assert_eq!(*seen.lock(), vec![(4, ResourceEvent::Playing)]);
    }

    #[test]
    fn drop_revokes() {
        let registration = ListenerRegistration::new(1);
        let sink = registration.sink(|_, _| {});
        drop(registration);
        assert!(sink.is_revoked());
    }
}
