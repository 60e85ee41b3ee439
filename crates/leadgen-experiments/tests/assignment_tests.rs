mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use leadgen_experiments::{
    AssignVisitorCommand, AssignmentMethod, Campaign, EntityId, ExperimentError, ExperimentStore, ExperimentUseCases,
    PinVisitorCommand, VisitorId,
};
use tokio_test::assert_err;

fn assign(visitor: &str) -> AssignVisitorCommand {
    AssignVisitorCommand::new(CAMPAIGN, visitor)
}

#[tokio::test]
async fn assign_twice_returns_same_variant_and_counts_once() {
    let h = harness();
    seed_active(&*h.store, &[("control", 50), ("short-form", 50)]).await;

    let first = h.service.assign(assign("cookie-abc")).await.unwrap();
    let second = h.service.assign(assign("cookie-abc")).await.unwrap();

    assert!(first.newly_assigned);
    assert!(!second.newly_assigned);
    assert_eq!(first.variant.id(), second.variant.id());
    assert_eq!(first.assignment.id(), second.assignment.id());
    assert_eq!(first.assignment.method(), AssignmentMethod::Hash);

    let campaign = stored_campaign(&*h.store).await;
    assert_eq!(campaign.stats().visitors, 1);
    let total: u64 = campaign.variants().iter().map(|v| v.stats().visitors).sum();
    assert_eq!(total, 1);
    assert_eq!(campaign.variant(first.variant.id()).unwrap().stats().visitors, 1);

    assert_eq!(h.sink.count_of("experiment.visitor_assigned"), 1);
    assert!(first.assignment.is_fully_tallied());
}

#[tokio::test]
async fn assignment_matches_visitor_bucket() {
    let h = harness();
    seed_active(&*h.store, &[("big", 50), ("mid", 30), ("small", 20)]).await;

    for id in visitors_where(5, |b| b < 50) {
        assert_eq!(h.service.assign(assign(&id)).await.unwrap().variant.id().as_str(), "big");
    }
    for id in visitors_where(5, |b| (50..80).contains(&b)) {
        assert_eq!(h.service.assign(assign(&id)).await.unwrap().variant.id().as_str(), "mid");
    }
    for id in visitors_where(5, |b| b >= 80) {
        assert_eq!(h.service.assign(assign(&id)).await.unwrap().variant.id().as_str(), "small");
    }
}

#[tokio::test]
async fn distribution_follows_weights() {
    let h = harness();
    seed_active(&*h.store, &[("a", 50), ("b", 30), ("c", 20)]).await;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for i in 0..10_000 {
        let outcome = h.service.assign(assign(&format!("synthetic-{i}"))).await.unwrap();
        *counts.entry(outcome.variant.id().to_string()).or_default() += 1;
    }

    for (id, expected) in [("a", 50.0), ("b", 30.0), ("c", 20.0)] {
        let share = counts.get(id).copied().unwrap_or(0) as f64 / 100.0;
        assert!(
            (share - expected).abs() < 3.0,
            "variant {id} got {share:.2}%, expected about {expected}%"
        );
    }

    let campaign = stored_campaign(&*h.store).await;
    assert_eq!(campaign.stats().visitors, 10_000);
    assert_eq!(h.store.assignment_count(), 10_000);
}

#[tokio::test]
async fn under_allocated_weights_fall_back_to_last_variant() {
    let h = harness();
    seed_active(&*h.store, &[("first", 40), ("second", 40)]).await;

    for id in visitors_where(20, |b| b >= 80) {
        let outcome = h.service.assign(assign(&id)).await.unwrap();
        assert_eq!(outcome.variant.id().as_str(), "second");
    }
    for id in visitors_where(20, |b| b < 40) {
        let outcome = h.service.assign(assign(&id)).await.unwrap();
        assert_eq!(outcome.variant.id().as_str(), "first");
    }
}

#[tokio::test]
async fn paused_campaign_rejects_assignment_without_side_effects() {
    let h = harness();
    let mut c = campaign(&[("control", 100)]);
    c.activate().unwrap();
    c.pause().unwrap();
    h.store.save_campaign(&c).await.unwrap();

    let err = h.service.assign(assign("cookie-paused")).await.unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::CampaignNotActive { status: leadgen_experiments::CampaignStatus::Paused, .. }
    ));
    assert_eq!(h.store.assignment_count(), 0);
    assert_eq!(stored_campaign(&*h.store).await.stats().visitors, 0);
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn draft_and_completed_campaigns_are_not_active() {
    let h = harness();
    h.store.save_campaign(&campaign(&[("control", 100)])).await.unwrap();
    assert_err!(h.service.assign(assign("v")).await);

    let mut c = campaign(&[("control", 100)]);
    c.activate().unwrap();
    c.complete().unwrap();
    h.store.save_campaign(&c).await.unwrap();
    let err = h.service.assign(assign("v")).await.unwrap_err();
    assert!(matches!(err, ExperimentError::CampaignNotActive { .. }));
}

#[tokio::test]
async fn unknown_campaign() {
    let h = harness();
    let err = h.service.assign(AssignVisitorCommand::new("missing", "v")).await.unwrap_err();
    assert_eq!(err, ExperimentError::CampaignNotFound("missing".into()));
}

#[tokio::test]
async fn active_campaign_without_variants() {
    let h = harness();
    // Stored rows can bypass activation checks
    let c: Campaign = serde_json::from_value(serde_json::json!({
        "id": CAMPAIGN,
        "name": "Broken",
        "status": "active",
        "variants": [],
        "stats": { "visitors": 0, "conversions": 0, "conversion_rate": 0.0 },
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    }))
    .unwrap();
    h.store.save_campaign(&c).await.unwrap();

    let err = h.service.assign(assign("v")).await.unwrap_err();
    assert_eq!(err, ExperimentError::NoVariantsAvailable(CAMPAIGN.into()));
    assert_eq!(h.store.assignment_count(), 0);
}

#[tokio::test]
async fn blank_visitor_id_is_rejected() {
    let h = harness();
    seed_active(&*h.store, &[("control", 100)]).await;

    let err = h.service.assign(assign("   ")).await.unwrap_err();
    assert!(matches!(err, ExperimentError::InvalidVisitorId(_)));
    assert_eq!(h.store.assignment_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_requests_create_one_assignment() {
    let h = harness();
    seed_active(&*h.store, &[("control", 50), ("challenger", 50)]).await;

    let mut handles = Vec::new();
    for _ in 0..32 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move { service.assign(assign("double-load")).await }));
    }

    let mut variants = HashSet::new();
    let mut created = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        variants.insert(outcome.variant.id().clone());
        if outcome.newly_assigned {
            created += 1;
        }
    }

    assert_eq!(variants.len(), 1);
    assert_eq!(created, 1);
    assert_eq!(h.store.assignment_count(), 1);
    assert_eq!(stored_campaign(&*h.store).await.stats().visitors, 1);
}

#[tokio::test]
async fn pinned_visitor_gets_requested_variant_once() {
    let h = harness();
    seed_active(&*h.store, &[("control", 100), ("preview", 0)]).await;

    let pin = PinVisitorCommand {
        campaign_id: CAMPAIGN.into(),
        visitor_id: "qa-tester".into(),
        variant_id: "preview".into(),
    };
    let outcome = h.service.assign_to_variant(pin).await.unwrap();
    assert!(outcome.newly_assigned);
    assert_eq!(outcome.variant.id().as_str(), "preview");
    assert_eq!(outcome.assignment.method(), AssignmentMethod::Manual);

    // Later bucketed requests keep the pin
    let again = h.service.assign(assign("qa-tester")).await.unwrap();
    assert!(!again.newly_assigned);
    assert_eq!(again.variant.id().as_str(), "preview");

    let campaign = stored_campaign(&*h.store).await;
    assert_eq!(campaign.variant(&EntityId::from_string("preview")).unwrap().stats().visitors, 1);
    assert_eq!(campaign.stats().visitors, 1);
}

#[tokio::test]
async fn pin_does_not_move_assigned_visitor() {
    let h = harness();
    seed_active(&*h.store, &[("control", 100), ("preview", 0)]).await;

    h.service.assign(assign("regular")).await.unwrap();
    let outcome = h
        .service
        .assign_to_variant(PinVisitorCommand {
            campaign_id: CAMPAIGN.into(),
            visitor_id: "regular".into(),
            variant_id: "preview".into(),
        })
        .await
        .unwrap();

    assert!(!outcome.newly_assigned);
    assert_eq!(outcome.variant.id().as_str(), "control");
}

#[tokio::test]
async fn pin_to_unknown_variant() {
    let h = harness();
    seed_active(&*h.store, &[("control", 100)]).await;

    let err = h
        .service
        .assign_to_variant(PinVisitorCommand {
            campaign_id: CAMPAIGN.into(),
            visitor_id: "qa".into(),
            variant_id: "nope".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ExperimentError::VariantNotFound { .. }));
    assert!(h
        .store
        .find_assignment(&campaign_id(), &VisitorId::new("qa").unwrap())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn pausing_from_an_old_copy_keeps_live_counters() {
    let h = harness();
    seed_active(&*h.store, &[("control", 50), ("challenger", 50)]).await;
    let mut stale = stored_campaign(&*h.store).await;

    for i in 0..50 {
        h.service.assign(assign(&format!("before-pause-{i}"))).await.unwrap();
    }

    stale.pause().unwrap();
    h.store.save_campaign(&stale).await.unwrap();

    let campaign = stored_campaign(&*h.store).await;
    assert_eq!(campaign.status(), leadgen_experiments::CampaignStatus::Paused);
    assert_eq!(campaign.stats().visitors, 50);
    let total: u64 = campaign.variants().iter().map(|v| v.stats().visitors).sum();
    assert_eq!(total, 50);
    assert_eq!(h.store.assignment_count(), 50);
}
