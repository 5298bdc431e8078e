//! Alert dispatch: broadcast fan-out plus the emergency-contact
//! notification leg.
//!
//! Dispatch publishes the event first so subscribers always see the
//! alert, then attempts a single notification to the subject's primary
//! contact under a timeout. Notification failures are logged and
//! reported in the outcome, never retried, and never fail the
//! dispatch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use safewatch_models::{
    AlertDecision, AlertEvent, Contact, DispatchOutcome, NotificationOutcome,
};
use tokio::sync::RwLock;

use crate::{broadcast::AlertBroadcaster, NotifyError};

/// Timeout for one notification attempt.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// An outbound notification provider.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message to a contact and returns the provider's
    /// message id.
    ///
    /// # Errors
    ///
    /// * If the provider rejects or fails the send.
    async fn send(&self, contact: &Contact, message: &str) -> Result<String, NotifyError>;
}

/// Directory of emergency contacts, keyed by subject.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Looks up the subject's primary contact, if any.
    ///
    /// # Errors
    ///
    /// * If the directory cannot be queried.
    async fn primary_contact_for(&self, subject_id: &str) -> Result<Option<Contact>, NotifyError>;
}

/// Fans a fired alert out to subscribers and the emergency contact.
pub struct AlertDispatcher {
    broadcaster: AlertBroadcaster,
    contacts: Arc<dyn ContactLookup>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl AlertDispatcher {
    /// Creates a dispatcher with the default 5-second notification
    /// timeout.
    #[must_use]
    pub fn new(
        broadcaster: AlertBroadcaster,
        contacts: Arc<dyn ContactLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            broadcaster,
            contacts,
            notifier,
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }

    /// Overrides the notification timeout.
    #[must_use]
    pub const fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// The broadcaster, for registering subscribers.
    #[must_use]
    pub const fn broadcaster(&self) -> &AlertBroadcaster {
        &self.broadcaster
    }

    /// Dispatches a fired alert. The broadcast leg always runs; the
    /// notification leg runs once under the timeout.
    pub async fn dispatch(&self, decision: &AlertDecision) -> DispatchOutcome {
        let event = AlertEvent::new_alert(decision.clone(), chrono::Utc::now());
        let subscribers_reached = self.broadcaster.publish(&event);

        let notification = self.notify(decision).await;
        if let NotificationOutcome::Failed { reason } = &notification {
            log::error!(
                "Notification for subject {} failed: {reason}",
                decision.subject_id
            );
        }

        DispatchOutcome {
            subscribers_reached,
            notification,
        }
    }

    async fn notify(&self, decision: &AlertDecision) -> NotificationOutcome {
        let contact = match self.contacts.primary_contact_for(&decision.subject_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => return NotificationOutcome::NoContact,
            Err(e) => {
                return NotificationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let message = alert_message(decision);
        let send = self.notifier.send(&contact, &message);

        match tokio::time::timeout(self.notify_timeout, send).await {
            Ok(Ok(provider_id)) => {
                log::info!(
                    "Notified {} for subject {} (provider id {provider_id})",
                    contact.name,
                    decision.subject_id
                );
                NotificationOutcome::Sent { provider_id }
            }
            Ok(Err(e)) => NotificationOutcome::Failed {
                reason: e.to_string(),
            },
            Err(_) => {
                log::error!(
                    "Notification for subject {} timed out after {:?}",
                    decision.subject_id,
                    self.notify_timeout
                );
                NotificationOutcome::TimedOut
            }
        }
    }
}

/// Builds the notification text for a fired alert.
fn alert_message(decision: &AlertDecision) -> String {
    let mut message = match &decision.zone {
        Some(zone) => format!("Red zone alert: entered {}.", zone.name),
        None => "Distress alert triggered.".to_string(),
    };
    if let Some(coords) = decision.coordinates {
        message.push_str(&format!(
            " Location: https://maps.google.com/?q={},{}",
            coords.latitude, coords.longitude
        ));
    }
    message
}

/// Mock SMS provider. Records every message and returns a fake
/// provider id; stands in for a real gateway in tests and demos.
#[derive(Default)]
pub struct MockSmsNotifier {
    sent: RwLock<Vec<(Contact, String)>>,
}

impl MockSmsNotifier {
    /// Creates an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far.
    pub async fn sent(&self) -> Vec<(Contact, String)> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for MockSmsNotifier {
    async fn send(&self, contact: &Contact, message: &str) -> Result<String, NotifyError> {
        let mut sent = self.sent.write().await;
        sent.push((contact.clone(), message.to_string()));
        log::debug!("Mock SMS to {}: {message}", contact.phone);
        Ok(format!("mock-{}", sent.len()))
    }
}

/// In-memory contact directory for tests and demos.
#[derive(Default)]
pub struct MemoryContactLookup {
    contacts: RwLock<Vec<(String, Contact)>>,
}

impl MemoryContactLookup {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a contact for a subject.
    pub async fn add(&self, subject_id: impl Into<String>, contact: Contact) {
        self.contacts.write().await.push((subject_id.into(), contact));
    }
}

#[async_trait]
impl ContactLookup for MemoryContactLookup {
    async fn primary_contact_for(&self, subject_id: &str) -> Result<Option<Contact>, NotifyError> {
        let contacts = self.contacts.read().await;
        let primary = contacts
            .iter()
            .filter(|(id, _)| id == subject_id)
            .map(|(_, contact)| contact)
            .find(|contact| contact.is_primary)
            .or_else(|| {
                contacts
                    .iter()
                    .find(|(id, _)| id == subject_id)
                    .map(|(_, contact)| contact)
            });
        Ok(primary.cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use safewatch_models::{
        AlertSource, Coordinates, RiskLevel, Zone, ZoneOrigin,
    };

    use super::*;

    fn contact(is_primary: bool) -> Contact {
        Contact {
            id: "c-1".to_string(),
            name: "Asha".to_string(),
            phone: "+15550100".to_string(),
            is_primary,
        }
    }

    fn zone_decision() -> AlertDecision {
        AlertDecision {
            fire: true,
            zone: Some(Zone {
                id: "auto:28.704_77.103".to_string(),
                name: "Auto zone 28.704_77.103".to_string(),
                origin: ZoneOrigin::Auto,
                center: Coordinates::new(28.7041, 77.1025),
                radius_meters: 200.0,
                risk_level: RiskLevel::High,
                avg_risk: 75.0,
                member_count: 3,
            }),
            subject_id: "s-1".to_string(),
            coordinates: Some(Coordinates::new(28.7041, 77.1025)),
            decided_at: Utc::now(),
            source: AlertSource::ZoneEntry,
        }
    }

    fn dispatcher(
        contacts: Arc<MemoryContactLookup>,
        notifier: Arc<dyn Notifier>,
    ) -> AlertDispatcher {
        AlertDispatcher::new(AlertBroadcaster::new(8), contacts, notifier)
    }

    #[tokio::test]
    async fn dispatch_broadcasts_and_notifies_primary_contact() {
        let contacts = Arc::new(MemoryContactLookup::new());
        contacts.add("s-1", contact(true)).await;
        let sms = Arc::new(MockSmsNotifier::new());
        let dispatcher = dispatcher(Arc::clone(&contacts), Arc::clone(&sms) as Arc<dyn Notifier>);
        let mut subscriber = dispatcher.broadcaster().subscribe();

        let outcome = dispatcher.dispatch(&zone_decision()).await;

        assert_eq!(outcome.subscribers_reached, 1);
        assert!(matches!(
            outcome.notification,
            NotificationOutcome::Sent { .. }
        ));

        let event = subscriber.recv().await.unwrap();
        assert_eq!(event.event_type, "new_alert");
        assert!(event.alert.fire);

        let sent = sms.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Auto zone 28.704_77.103"));
        assert!(sent[0].1.contains("maps.google.com"));
    }

    #[tokio::test]
    async fn missing_contact_yields_no_contact_outcome() {
        let contacts = Arc::new(MemoryContactLookup::new());
        let sms = Arc::new(MockSmsNotifier::new());
        let dispatcher = dispatcher(contacts, Arc::clone(&sms) as Arc<dyn Notifier>);

        let outcome = dispatcher.dispatch(&zone_decision()).await;

        assert!(matches!(
            outcome.notification,
            NotificationOutcome::NoContact
        ));
        assert!(sms.sent().await.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_reported_not_propagated() {
        struct FailingNotifier;

        #[async_trait]
        impl Notifier for FailingNotifier {
            async fn send(&self, _: &Contact, _: &str) -> Result<String, NotifyError> {
                Err(NotifyError::Provider {
                    message: "gateway unavailable".to_string(),
                })
            }
        }

        let contacts = Arc::new(MemoryContactLookup::new());
        contacts.add("s-1", contact(true)).await;
        let dispatcher = dispatcher(contacts, Arc::new(FailingNotifier));

        let outcome = dispatcher.dispatch(&zone_decision()).await;

        match outcome.notification {
            NotificationOutcome::Failed { reason } => {
                assert!(reason.contains("gateway unavailable"));
            }
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        struct SlowNotifier;

        #[async_trait]
        impl Notifier for SlowNotifier {
            async fn send(&self, _: &Contact, _: &str) -> Result<String, NotifyError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("never".to_string())
            }
        }

        let contacts = Arc::new(MemoryContactLookup::new());
        contacts.add("s-1", contact(true)).await;
        let dispatcher = dispatcher(contacts, Arc::new(SlowNotifier));

        let outcome = dispatcher.dispatch(&zone_decision()).await;
        assert!(matches!(
            outcome.notification,
            NotificationOutcome::TimedOut
        ));
    }

    #[tokio::test]
    async fn primary_contact_preferred_over_secondary() {
        let contacts = Arc::new(MemoryContactLookup::new());
        let mut secondary = contact(false);
        secondary.id = "c-2".to_string();
        secondary.name = "Ravi".to_string();
        contacts.add("s-1", secondary).await;
        contacts.add("s-1", contact(true)).await;

        let found = contacts.primary_contact_for("s-1").await.unwrap().unwrap();
        assert_eq!(found.name, "Asha");
    }

    #[tokio::test]
    async fn distress_decision_gets_distress_message() {
        let contacts = Arc::new(MemoryContactLookup::new());
        contacts.add("s-1", contact(true)).await;
        let sms = Arc::new(MockSmsNotifier::new());
        let dispatcher = dispatcher(contacts, Arc::clone(&sms) as Arc<dyn Notifier>);

        let mut decision = zone_decision();
        decision.zone = None;
        decision.source = AlertSource::DistressKeyword;
        dispatcher.dispatch(&decision).await;

        let sent = sms.sent().await;
        assert!(sent[0].1.starts_with("Distress alert triggered."));
    }
}
