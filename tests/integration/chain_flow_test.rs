//! Upsell/downsell funnel behavior: ordering, decline advancement, follow-on
//! method reuse, and the never-strand-the-buyer recovery path.

#[path = "../helpers/mod.rs"]
mod helpers;

use funnelpay::core::{AppError, Currency};
use funnelpay::modules::catalog::services::CatalogService;
use funnelpay::modules::chain::models::ChainNodeKind;
use funnelpay::modules::chain::services::{ChainAcceptOutcome, ChainService, ChainStep};
use funnelpay::modules::payments::models::PaymentStatus;
use funnelpay::modules::payments::repositories::PaymentRepository;
use funnelpay::modules::processors::services::ProcessorRegistry;
use helpers::fakes::*;
use helpers::test_data::*;
use rust_decimal::Decimal;
use std::sync::Arc;

struct Setup {
    catalog_repo: Arc<InMemoryCatalogRepository>,
    chain_repo: Arc<InMemoryChainRepository>,
    payments: Arc<InMemoryPaymentRepository>,
    card: Arc<FakeProcessor>,
    service: ChainService,
}

fn setup() -> Setup {
    let catalog_repo = Arc::new(InMemoryCatalogRepository::new());
    let chain_repo = Arc::new(InMemoryChainRepository::new());
    let payments = Arc::new(InMemoryPaymentRepository::new());
    let card = Arc::new(FakeProcessor::card("stripe"));

    let mut registry = ProcessorRegistry::new();
    registry.register(card.clone());

    let service = ChainService::new(
        chain_repo.clone(),
        Arc::new(CatalogService::new(catalog_repo.clone())),
        payments.clone(),
        Arc::new(registry),
    );

    Setup {
        catalog_repo,
        chain_repo,
        payments,
        card,
        service,
    }
}

/// Product with a two-node funnel: upsell at position 1, downsell at position 2
async fn seed_two_node_funnel(s: &Setup) -> String {
    s.catalog_repo.insert_product(product("prod-1", "stripe"));
    s.catalog_repo
        .insert_offer(offer("offer-1", "prod-1", Currency::BRL, Decimal::new(10000, 2)));
    s.catalog_repo
        .insert_offer(offer("offer-up", "prod-1", Currency::BRL, Decimal::new(19700, 2)));
    s.catalog_repo
        .insert_offer(offer("offer-dn", "prod-1", Currency::BRL, Decimal::new(9700, 2)));

    s.chain_repo.insert_node(chain_node(
        "node-1",
        "prod-1",
        "offer-up",
        ChainNodeKind::Upsell,
        1,
    ));
    s.chain_repo.insert_node(chain_node(
        "node-2",
        "prod-1",
        "offer-dn",
        ChainNodeKind::Downsell,
        2,
    ));

    let original = completed_payment("prod-1", "offer-1", "stripe", Some("pm_tok_original"));
    s.payments.create(&original).await.unwrap();
    original.id.clone()
}

#[tokio::test]
async fn present_returns_the_chain_offer() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    let step = s
        .service
        .present(ChainNodeKind::Upsell, "offer-up", &pi)
        .await
        .unwrap();

    match step {
        ChainStep::Offer { node, offer } => {
            assert_eq!(node.id, "node-1");
            assert_eq!(offer.id, "offer-up");
            assert_eq!(offer.price, Decimal::new(19700, 2));
        }
        other => panic!("Expected offer step, got {:?}", other),
    }
}

#[tokio::test]
async fn declining_both_nodes_terminates_at_success_destination() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    // Decline upsell node 1 -> controller presents node 2
    let step = s
        .service
        .decline(ChainNodeKind::Upsell, "offer-up", &pi)
        .await
        .unwrap();
    let downsell_offer = match step {
        ChainStep::Offer { node, offer } => {
            assert_eq!(node.id, "node-2");
            assert!(node.position > 1);
            offer
        }
        other => panic!("Expected offer step, got {:?}", other),
    };

    // Decline node 2 -> terminal pointing at the product's success destination
    let step = s
        .service
        .decline(ChainNodeKind::Downsell, &downsell_offer.id, &pi)
        .await
        .unwrap();
    match step {
        ChainStep::Terminal { success_url } => {
            assert_eq!(success_url, "https://seller.example.com/obrigado");
        }
        other => panic!("Expected terminal step, got {:?}", other),
    }
}

#[tokio::test]
async fn accept_reuses_original_method_without_collecting_credentials() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    let outcome = s
        .service
        .accept(ChainNodeKind::Upsell, "offer-up", &pi)
        .await
        .unwrap();

    let payment = match outcome {
        ChainAcceptOutcome::Accepted { payment, .. } => payment,
        other => panic!("Expected accepted outcome, got {:?}", other),
    };

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.origin_payment_id.as_deref(), Some(pi.as_str()));
    assert_eq!(payment.offer_id, "offer-up");
    assert_eq!(payment.amount, Decimal::new(19700, 2));
    assert_eq!(payment.currency, Currency::BRL);

    // Buyer snapshot copied from the original payment, never re-collected
    assert_eq!(payment.buyer_email, "ana@example.com");

    // The processor saw only the stored method token
    let refs = s.card.follow_on_refs.lock().unwrap();
    assert_eq!(refs.as_slice(), ["pm_tok_original"]);
}

#[tokio::test]
async fn method_not_reusable_becomes_an_automatic_decline() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;
    s.card.fail_next(FakeFailure::MethodNotReusable);

    let outcome = s
        .service
        .accept(ChainNodeKind::Upsell, "offer-up", &pi)
        .await
        .unwrap();

    // Recovered locally: the buyer advances to the next node, no visible error
    match outcome {
        ChainAcceptOutcome::Skipped { next } => match next {
            ChainStep::Offer { node, .. } => assert_eq!(node.id, "node-2"),
            other => panic!("Expected next offer step, got {:?}", other),
        },
        other => panic!("Expected skipped outcome, got {:?}", other),
    }

    // The abandoned follow-on row is closed out as failed
    let follow_on = s
        .payments
        .get(&s.card.intent_requests.lock().unwrap()[0].reference)
        .unwrap();
    assert_eq!(follow_on.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn missing_method_ref_skips_without_processor_call() {
    let s = setup();
    s.catalog_repo.insert_product(product("prod-1", "stripe"));
    s.catalog_repo
        .insert_offer(offer("offer-up", "prod-1", Currency::BRL, Decimal::new(19700, 2)));
    s.chain_repo.insert_node(chain_node(
        "node-1",
        "prod-1",
        "offer-up",
        ChainNodeKind::Upsell,
        1,
    ));

    let original = completed_payment("prod-1", "offer-1", "stripe", None);
    s.payments.create(&original).await.unwrap();

    let outcome = s
        .service
        .accept(ChainNodeKind::Upsell, "offer-up", &original.id)
        .await
        .unwrap();

    match outcome {
        ChainAcceptOutcome::Skipped { next } => {
            assert!(matches!(next, ChainStep::Terminal { .. }));
        }
        other => panic!("Expected skipped outcome, got {:?}", other),
    }
    assert_eq!(s.card.intent_request_count(), 0);
}

#[tokio::test]
async fn chain_requires_a_completed_primary_payment() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    // Regress the original to pending; the funnel must refuse it
    let original = s.payments.get(&pi).unwrap();
    let mut pending = original.clone();
    pending.status = PaymentStatus::Pending;
    s.payments.create(&pending).await.unwrap();

    let result = s.service.present(ChainNodeKind::Upsell, "offer-up", &pi).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn node_kind_must_match_route() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    // offer-dn hangs off a downsell node; the upsell route must not serve it
    let result = s.service.present(ChainNodeKind::Upsell, "offer-dn", &pi).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn nodes_with_unavailable_offers_are_skipped_on_advance() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    // Third node whose offer is inactive, then a fourth healthy one
    let mut dead_offer = offer("offer-dead", "prod-1", Currency::BRL, Decimal::new(500, 2));
    dead_offer.active = false;
    s.catalog_repo.insert_offer(dead_offer);
    s.catalog_repo
        .insert_offer(offer("offer-final", "prod-1", Currency::BRL, Decimal::new(2900, 2)));
    s.chain_repo.insert_node(chain_node(
        "node-3",
        "prod-1",
        "offer-dead",
        ChainNodeKind::Downsell,
        3,
    ));
    s.chain_repo.insert_node(chain_node(
        "node-4",
        "prod-1",
        "offer-final",
        ChainNodeKind::Downsell,
        4,
    ));

    let step = s
        .service
        .decline(ChainNodeKind::Downsell, "offer-dn", &pi)
        .await
        .unwrap();

    match step {
        ChainStep::Offer { node, .. } => assert_eq!(node.id, "node-4"),
        other => panic!("Expected node-4 offer step, got {:?}", other),
    }
}

#[tokio::test]
async fn presented_positions_are_strictly_increasing() {
    let s = setup();
    let pi = seed_two_node_funnel(&s).await;

    let mut positions = vec![];
    let mut current_offer = "offer-up".to_string();
    let mut kind = ChainNodeKind::Upsell;

    loop {
        match s.service.decline(kind, &current_offer, &pi).await.unwrap() {
            ChainStep::Offer { node, offer } => {
                positions.push(node.position);
                current_offer = offer.id;
                kind = node.kind;
            }
            ChainStep::Terminal { .. } => break,
        }
    }

    let mut sorted = positions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(positions, sorted, "positions repeated or out of order");
}
