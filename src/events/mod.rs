//! Event bus and webhook dispatch: a typed handler registry plus
//! subscription fan-out with an SSRF guard, HMAC signing, bcrypt-at-rest
//! secrets, and retry/backoff (spec.md §4.9).
//!
//! Grounded in the teacher's `src/event_processing` (connectors.rs,
//! sourcing.rs) for the publish/dispatch shape and `src/security` for the
//! crypto primitives.

mod dispatch;
mod handler;
mod signing;
mod subscription;

pub use dispatch::{deliver, DeliveryOutcome, WebhookSender};
pub use handler::{Event, EventHandler, HandlerRegistry};
pub use signing::{hash_secret_for_storage, sign_payload, verify_secret};
pub use subscription::Subscription;

use crate::config::PlatformEnv;
use std::time::Duration;

/// Publishes `event` to every registered handler and then to every active,
/// matching subscription. Both legs are fire-and-forget: handler and
/// delivery failures are collected for logging but never propagate to the
/// publisher (spec.md §4.9).
pub struct EventBus {
    registry: HandlerRegistry,
}

impl EventBus {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn publish(
        &self,
        event: &Event,
        subscriptions: &[(Subscription, String)],
        sender: &dyn WebhookSender,
        env: PlatformEnv,
        sleep: impl Fn(Duration),
    ) -> PublishReport {
        let handler_errors = self.registry.dispatch(event);

        let mut delivery_outcomes = Vec::new();
        for (subscription, secret_plaintext) in subscriptions {
            if !subscription.matches(&event.event_type) {
                continue;
            }
            let outcome = deliver(subscription, event, secret_plaintext, sender, env, &sleep)
                .unwrap_or(DeliveryOutcome {
                    attempts: 0,
                    success: false,
                    last_status: None,
                    last_error: Some("subscription URL failed validation".to_string()),
                });
            delivery_outcomes.push((subscription.id, outcome));
        }

        PublishReport {
            handler_errors,
            delivery_outcomes,
        }
    }
}

pub struct PublishReport {
    pub handler_errors: Vec<String>,
    pub delivery_outcomes: Vec<(uuid::Uuid, DeliveryOutcome)>,
}
