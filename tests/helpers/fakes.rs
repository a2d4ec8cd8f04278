//! In-memory fakes for the external collaborators: storage, processors, access
//! grant, and notifications. Services are exercised directly against these, so
//! the suites run without a database or network.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use funnelpay::core::{AppError, Currency, Result};
use funnelpay::modules::catalog::models::{Offer, Product};
use funnelpay::modules::catalog::repositories::CatalogRepository;
use funnelpay::modules::chain::models::ChainNode;
use funnelpay::modules::chain::repositories::ChainRepository;
use funnelpay::modules::fulfillment::services::{AccessGranter, NotificationKind, Notifier};
use funnelpay::modules::payments::models::{BuyerIdentity, Payment, PaymentStatus};
use funnelpay::modules::payments::repositories::PaymentRepository;
use funnelpay::modules::processors::services::{
    IntentRequest, ProcessorAdapter, ProcessorEvent, ProcessorIntent,
};
use std::collections::HashMap;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Storage fakes

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    products: Mutex<HashMap<String, Product>>,
    offers: Mutex<HashMap<String, Offer>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id.clone(), product);
    }

    pub fn insert_offer(&self, offer: Offer) {
        self.offers.lock().unwrap().insert(offer.id.clone(), offer);
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>> {
        Ok(self.products.lock().unwrap().get(product_id).cloned())
    }

    async fn find_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        Ok(self.offers.lock().unwrap().get(offer_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<HashMap<String, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<Payment> {
        self.payments.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<()> {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>> {
        Ok(self.payments.lock().unwrap().get(id).cloned())
    }

    async fn find_by_processor_ref(&self, processor_payment_id: &str) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.processor_payment_id.as_deref() == Some(processor_payment_id))
            .cloned())
    }

    async fn attach_intent(
        &self,
        id: &str,
        processor_payment_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut payments = self.payments.lock().unwrap();
        if let Some(payment) = payments.get_mut(id) {
            payment.processor_payment_id = Some(processor_payment_id.to_string());
            payment.expires_at = expires_at;
        }
        Ok(())
    }

    async fn attach_method_ref(&self, id: &str, method_ref: &str) -> Result<()> {
        let mut payments = self.payments.lock().unwrap();
        if let Some(payment) = payments.get_mut(id) {
            payment.payment_method_ref = Some(method_ref.to_string());
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool> {
        // Same guard semantics as the conditional SQL update: apply only if the
        // current status matches the expected pre-state
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(id) {
            Some(payment) if payment.status == from => {
                payment.status = to;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryChainRepository {
    nodes: Mutex<Vec<ChainNode>>,
}

impl InMemoryChainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&self, node: ChainNode) {
        self.nodes.lock().unwrap().push(node);
    }
}

#[async_trait]
impl ChainRepository for InMemoryChainRepository {
    async fn find_node(&self, product_id: &str, offer_id: &str) -> Result<Option<ChainNode>> {
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.product_id == product_id && n.offer_id == offer_id && n.active)
            .cloned())
    }

    async fn next_active_node(
        &self,
        product_id: &str,
        position: i32,
    ) -> Result<Option<ChainNode>> {
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.product_id == product_id && n.active && n.position > position)
            .min_by_key(|n| n.position)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Processor fake

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeIntentKind {
    Card,
    InstantTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    Rejected,
    MethodNotReusable,
}

/// Configurable processor stand-in recording every request it receives
pub struct FakeProcessor {
    name: String,
    currencies: Vec<Currency>,
    kind: FakeIntentKind,
    require_tax_id: bool,
    next_failure: Mutex<Option<FakeFailure>>,
    counter: Mutex<u32>,
    pub intent_requests: Mutex<Vec<IntentRequest>>,
    pub follow_on_refs: Mutex<Vec<String>>,
}

impl FakeProcessor {
    pub fn card(name: &str) -> Self {
        Self {
            name: name.to_string(),
            currencies: vec![Currency::BRL, Currency::USD, Currency::EUR],
            kind: FakeIntentKind::Card,
            require_tax_id: false,
            next_failure: Mutex::new(None),
            counter: Mutex::new(0),
            intent_requests: Mutex::new(Vec::new()),
            follow_on_refs: Mutex::new(Vec::new()),
        }
    }

    pub fn pix(name: &str) -> Self {
        Self {
            name: name.to_string(),
            currencies: vec![Currency::BRL],
            kind: FakeIntentKind::InstantTransfer,
            require_tax_id: true,
            next_failure: Mutex::new(None),
            counter: Mutex::new(0),
            intent_requests: Mutex::new(Vec::new()),
            follow_on_refs: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self, failure: FakeFailure) {
        *self.next_failure.lock().unwrap() = Some(failure);
    }

    pub fn intent_request_count(&self) -> usize {
        self.intent_requests.lock().unwrap().len()
    }

    fn take_failure(&self) -> Option<AppError> {
        match self.next_failure.lock().unwrap().take() {
            Some(FakeFailure::Rejected) => Some(AppError::rejected(None)),
            Some(FakeFailure::MethodNotReusable) => Some(AppError::MethodNotReusable(
                "stored method expired".to_string(),
            )),
            None => None,
        }
    }

    fn next_intent(&self) -> ProcessorIntent {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        match self.kind {
            FakeIntentKind::Card => ProcessorIntent::Card {
                processor_payment_id: format!("{}_pi_{}", self.name, counter),
                client_secret: format!("{}_secret_{}", self.name, counter),
                public_key: "pk_test".to_string(),
            },
            FakeIntentKind::InstantTransfer => ProcessorIntent::InstantTransfer {
                processor_payment_id: format!("{}_charge_{}", self.name, counter),
                payment_code: format!("00020126{}", counter),
                payment_code_image: "aW1hZ2U=".to_string(),
                copy_paste: format!("00020126{}", counter),
                expires_at: Utc::now() + Duration::minutes(15),
            },
        }
    }
}

#[async_trait]
impl ProcessorAdapter for FakeProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_currencies(&self) -> &[Currency] {
        &self.currencies
    }

    fn validate_buyer(&self, buyer: &BuyerIdentity) -> Result<()> {
        buyer.validate_basic()?;
        if self.require_tax_id {
            buyer.validate_tax_id()?;
        }
        Ok(())
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<ProcessorIntent> {
        self.intent_requests.lock().unwrap().push(request);
        if let Some(failure) = self.take_failure() {
            return Err(failure);
        }
        Ok(self.next_intent())
    }

    async fn create_follow_on_intent(
        &self,
        request: IntentRequest,
        method_ref: &str,
    ) -> Result<ProcessorIntent> {
        self.intent_requests.lock().unwrap().push(request);
        self.follow_on_refs.lock().unwrap().push(method_ref.to_string());
        if let Some(failure) = self.take_failure() {
            return Err(failure);
        }
        Ok(self.next_intent())
    }

    fn verify_webhook(&self, signature: &str, _payload: &[u8]) -> Result<()> {
        if signature == "test-valid" {
            Ok(())
        } else {
            Err(AppError::unauthorized("Invalid fake signature"))
        }
    }

    async fn parse_event(&self, _payload: &str) -> Result<Option<ProcessorEvent>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Fulfillment fakes

#[derive(Default)]
pub struct RecordingAccessGranter {
    pub grants: Mutex<Vec<String>>,
    pub revokes: Mutex<Vec<String>>,
}

impl RecordingAccessGranter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().unwrap().len()
    }

    pub fn revoke_count(&self) -> usize {
        self.revokes.lock().unwrap().len()
    }
}

#[async_trait]
impl AccessGranter for RecordingAccessGranter {
    async fn grant(&self, payment: &Payment) -> Result<()> {
        self.grants.lock().unwrap().push(payment.id.clone());
        Ok(())
    }

    async fn revoke(&self, payment: &Payment) -> Result<()> {
        self.revokes.lock().unwrap().push(payment.id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        _payload: &serde_json::Value,
    ) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((kind, recipient.to_string()));
        Ok(())
    }
}
