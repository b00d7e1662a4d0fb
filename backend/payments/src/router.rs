//! Payment router — method-keyed dispatch to rail adapters.
//!
//! Pure lookup: one adapter per method tag, one invocation per donation
//! attempt, no retries. An unknown method is a normal rejected outcome.
//! Transport faults and timeouts surface as the same generic rejection shape
//! as a provider decline, so callers cannot tell infrastructure failure from
//! business failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::donations::PaymentMethod;
use crate::providers::{AmountUnit, ChargeOutcome, ChargeRequest, PaymentProvider};

const GENERIC_FAILURE: &str = "Payment processing failed";

pub struct PaymentRouter {
    providers: HashMap<PaymentMethod, Arc<dyn PaymentProvider>>,
    charge_timeout: Duration,
}

impl PaymentRouter {
    pub fn new(charge_timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            charge_timeout,
        }
    }

    pub fn with_provider(
        mut self,
        method: PaymentMethod,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        self.providers.insert(method, provider);
        self
    }

    /// The amount unit declared by the adapter registered for `method`.
    pub fn amount_unit(&self, method: PaymentMethod) -> Option<AmountUnit> {
        self.providers.get(&method).map(|p| p.amount_unit())
    }

    /// Dispatch one charge to the adapter registered for `method`.
    pub async fn dispatch(&self, method: PaymentMethod, request: &ChargeRequest) -> ChargeOutcome {
        let Some(provider) = self.providers.get(&method) else {
            return ChargeOutcome::rejected("Unsupported payment method");
        };

        match tokio::time::timeout(self.charge_timeout, provider.charge(request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("{} adapter fault: {e}", method.as_str());
                ChargeOutcome::rejected(GENERIC_FAILURE)
            }
            Err(_) => {
                warn!(
                    "{} adapter exceeded {:?} charge timeout",
                    method.as_str(),
                    self.charge_timeout
                );
                ChargeOutcome::rejected(GENERIC_FAILURE)
            }
        }
    }
}
