use super::handler::Event;
use super::signing::sign_payload;
use super::subscription::Subscription;
use crate::config::PlatformEnv;
use crate::error::Result;
use crate::governance::validate_webhook_url;
use std::collections::BTreeMap;
use std::time::Duration;

const RETRY_BACKOFFS_SECS: [u64; 3] = [1, 2, 4];

/// The outbound send itself is a collaborator concern (HTTP transport is
/// out of scope, spec.md §1); this crate owns the retry policy, signing,
/// and the SSRF guard around it.
pub trait WebhookSender: Send + Sync {
    fn send(&self, url: &str, body: &str, headers: &BTreeMap<String, String>) -> std::result::Result<u16, String>;
}

#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub attempts: u32,
    pub success: bool,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
}

/// Validates the subscription URL against the SSRF guard, signs the event
/// body, and attempts delivery up to three times with exponential backoff
/// (1s, 2s, 4s); any 2xx status is success, anything else retries
/// (spec.md §4.9). `sleep` is injected so tests can run the full retry
/// path without actually waiting.
pub fn deliver(
    subscription: &Subscription,
    event: &Event,
    secret_plaintext: &str,
    sender: &dyn WebhookSender,
    env: PlatformEnv,
    sleep: impl Fn(Duration),
) -> Result<DeliveryOutcome> {
    validate_webhook_url(&subscription.url, env)?;

    let body = event.payload.to_string();
    let signature = sign_payload(secret_plaintext, &body)?;

    let mut headers = BTreeMap::new();
    headers.insert("X-Ironlayer-Signature".to_string(), signature);
    headers.insert("X-Ironlayer-Event-Type".to_string(), event.event_type.clone());
    headers.insert("X-Ironlayer-Delivery-Id".to_string(), event.correlation_id.clone());

    let mut last_status = None;
    let mut last_error = None;

    for (attempt, backoff_secs) in std::iter::once(0).chain(RETRY_BACKOFFS_SECS).enumerate() {
        if attempt > 0 {
            sleep(Duration::from_secs(backoff_secs));
        }
        match sender.send(&subscription.url, &body, &headers) {
            Ok(status) if (200..300).contains(&status) => {
                return Ok(DeliveryOutcome {
                    attempts: attempt as u32 + 1,
                    success: true,
                    last_status: Some(status),
                    last_error: None,
                });
            }
            Ok(status) => last_status = Some(status),
            Err(e) => last_error = Some(e),
        }
    }

    Ok(DeliveryOutcome {
        attempts: (RETRY_BACKOFFS_SECS.len() + 1) as u32,
        success: false,
        last_status,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::signing::hash_secret_for_storage;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FlakySender {
        succeed_after: u32,
        calls: AtomicU32,
    }

    impl WebhookSender for FlakySender {
        fn send(&self, _url: &str, _body: &str, _headers: &BTreeMap<String, String>) -> std::result::Result<u16, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call + 1 >= self.succeed_after {
                Ok(200)
            } else {
                Ok(500)
            }
        }
    }

    fn subscription() -> Subscription {
        Subscription {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            url: "https://203.0.113.10/ironlayer".to_string(),
            event_types: ["plan.approved".to_string()].into_iter().collect(),
            secret_hash: hash_secret_for_storage("secret").unwrap(),
            active: true,
        }
    }

    #[test]
    fn succeeds_without_retry_on_first_2xx() {
        let sender = FlakySender {
            succeed_after: 1,
            calls: AtomicU32::new(0),
        };
        let sleeps = Mutex::new(Vec::new());
        let event = Event {
            event_type: "plan.approved".to_string(),
            correlation_id: "c1".to_string(),
            payload: json!({"plan_id": "p1"}),
        };
        let outcome = deliver(&subscription(), &event, "secret", &sender, PlatformEnv::Prod, |d| {
            sleeps.lock().unwrap().push(d);
        })
        .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn retries_with_backoff_then_succeeds() {
        let sender = FlakySender {
            succeed_after: 3,
            calls: AtomicU32::new(0),
        };
        let sleeps = Mutex::new(Vec::new());
        let event = Event {
            event_type: "plan.approved".to_string(),
            correlation_id: "c2".to_string(),
            payload: json!({"plan_id": "p2"}),
        };
        let outcome = deliver(&subscription(), &event, "secret", &sender, PlatformEnv::Prod, |d| {
            sleeps.lock().unwrap().push(d);
        })
        .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn exhausts_retries_and_reports_failure() {
        let sender = FlakySender {
            succeed_after: 99,
            calls: AtomicU32::new(0),
        };
        let event = Event {
            event_type: "plan.approved".to_string(),
            correlation_id: "c3".to_string(),
            payload: json!({"plan_id": "p3"}),
        };
        let outcome = deliver(&subscription(), &event, "secret", &sender, PlatformEnv::Prod, |_| {}).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.last_status, Some(500));
    }

    #[test]
    fn rejects_non_https_url_outside_dev_loopback() {
        let mut sub = subscription();
        sub.url = "http://evil.example.com/hook".to_string();
        let sender = FlakySender {
            succeed_after: 1,
            calls: AtomicU32::new(0),
        };
        let event = Event {
            event_type: "plan.approved".to_string(),
            correlation_id: "c4".to_string(),
            payload: json!({}),
        };
        let err = deliver(&sub, &event, "secret", &sender, PlatformEnv::Prod, |_| {}).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }
}
