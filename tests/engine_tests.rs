use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use sponsorlink::directory;
use sponsorlink::engine::{aggregator, escrow, offers, store, tiers};
use sponsorlink::entities::{
    campaign, perk_tier, profile, CampaignStatus, Campaigns, EscrowStatus, PerkTiers,
    ProfileType, RequestStatus,
};
use sponsorlink::error::AppError;
use sponsorlink::jobs::run_funding_reconciliation;

// A single-connection in-memory database so concurrent engine calls
// contend for the same state.
async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options)
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

fn money(value: i64) -> Decimal {
    Decimal::from(value)
}

async fn register(
    db: &DatabaseConnection,
    name: &str,
    profile_type: ProfileType,
) -> profile::Model {
    profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        display_name: Set(name.to_string()),
        profile_type: Set(profile_type),
        api_token: Set(Uuid::new_v4().to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("insert profile")
}

async fn campaign_with_tier(
    db: &DatabaseConnection,
    owner: &profile::Model,
    goal: i64,
    tier_amount: i64,
    max_sponsors: Option<i32>,
) -> (campaign::Model, perk_tier::Model) {
    let (record, mut tier_rows) = store::create_campaign(
        db,
        owner,
        store::NewCampaign {
            title: "Road to the nationals".to_string(),
            description: "Covers travel and equipment for the season".to_string(),
            goal_amount: money(goal),
            deadline: Utc::now() + Duration::days(30),
            tiers: vec![store::NewPerkTier {
                name: "Gold sponsor".to_string(),
                description: "Logo on the jersey".to_string(),
                amount: money(tier_amount),
                max_sponsors,
            }],
        },
    )
    .await
    .expect("create campaign");
    (record, tier_rows.remove(0))
}

async fn pending_offer(
    db: &DatabaseConnection,
    sponsor: &profile::Model,
    record: &campaign::Model,
    tier_id: Option<Uuid>,
    value: i64,
) -> offers::OfferWithEscrow {
    offers::submit_offer(
        db,
        offers::NewOffer {
            campaign_id: record.id,
            sponsor_id: sponsor.id,
            recipient_id: record.owner_id,
            perk_tier_id: tier_id,
            amount: money(value),
            is_custom: tier_id.is_none(),
            custom_perks: None,
            message: None,
        },
    )
    .await
    .expect("submit offer")
}

async fn reload_campaign(db: &DatabaseConnection, id: Uuid) -> campaign::Model {
    Campaigns::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn reload_tier(db: &DatabaseConnection, id: Uuid) -> perk_tier::Model {
    PerkTiers::find_by_id(id).one(db).await.unwrap().unwrap()
}

#[tokio::test]
async fn concurrent_approvals_never_oversell_a_tier() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, Some(1)).await;
    let sponsor_a = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;
    let sponsor_b = register(&db, "Globex Energy", ProfileType::Sponsor).await;

    // Both offers reach PENDING; capacity is only contended at approval.
    let offer_a = pending_offer(&db, &sponsor_a, &record, Some(tier.id), 1_000).await;
    let offer_b = pending_offer(&db, &sponsor_b, &record, Some(tier.id), 1_000).await;

    let (db_a, db_b) = (db.clone(), db.clone());
    let (id_a, id_b) = (offer_a.request.id, offer_b.request.id);
    let owner_id = owner.id;
    let (first, second) = tokio::join!(
        tokio::spawn(async move { offers::approve_offer(&db_a, id_a, owner_id).await }),
        tokio::spawn(async move { offers::approve_offer(&db_b, id_b, owner_id).await }),
    );
    let results = [first.unwrap(), second.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approval may win the last slot");
    let loser = results.iter().find(|r| r.is_err()).unwrap().as_ref().unwrap_err();
    assert!(matches!(loser, AppError::CapacityExceeded(_)), "got {loser}");

    let tier = reload_tier(&db, tier.id).await;
    assert_eq!(tier.current_sponsors, 1);
    let record = reload_campaign(&db, record.id).await;
    assert_eq!(record.current_funding, money(1_000));
    assert_eq!(record.status, CampaignStatus::Active);

    // The losing offer stays PENDING with its funds still HELD, free to be
    // re-resolved by the recipient.
    let resolved_a = offers::offer_with_escrow(&db, id_a).await.unwrap();
    let resolved_b = offers::offer_with_escrow(&db, id_b).await.unwrap();
    let statuses = [
        (resolved_a.request.status, resolved_a.escrow.status),
        (resolved_b.request.status, resolved_b.escrow.status),
    ];
    assert!(statuses.contains(&(RequestStatus::Active, EscrowStatus::Released)));
    assert!(statuses.contains(&(RequestStatus::Pending, EscrowStatus::Held)));
}

#[tokio::test]
async fn capacity_bounds_many_concurrent_approvals() {
    let db = setup_db().await;
    let owner = register(&db, "Riverton FC", ProfileType::Team).await;
    let (record, tier) = campaign_with_tier(&db, &owner, 10_000, 500, Some(2)).await;

    let mut offer_ids = Vec::new();
    for i in 0..4 {
        let sponsor = register(&db, &format!("Sponsor {i}"), ProfileType::Sponsor).await;
        let offer = pending_offer(&db, &sponsor, &record, Some(tier.id), 500).await;
        offer_ids.push(offer.request.id);
    }

    let mut handles = Vec::new();
    for id in offer_ids {
        let db = db.clone();
        let owner_id = owner.id;
        handles.push(tokio::spawn(async move {
            offers::approve_offer(&db, id, owner_id).await
        }));
    }
    let mut successes = 0;
    let mut capacity_losses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::CapacityExceeded(_)) => capacity_losses += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 2, "a two-slot tier admits exactly two sponsors");
    assert_eq!(capacity_losses, 2);

    let tier = reload_tier(&db, tier.id).await;
    assert_eq!(tier.current_sponsors, 2);
    let record = reload_campaign(&db, record.id).await;
    assert_eq!(record.current_funding, money(1_000));
}

#[tokio::test]
async fn approval_releases_escrow_and_counts_funding() {
    let db = setup_db().await;
    let owner = register(&db, "Marathon des Vignes", ProfileType::Event).await;
    let (record, tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, Some(3)).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    let offer = pending_offer(&db, &sponsor, &record, Some(tier.id), 1_200).await;
    assert_eq!(offer.request.status, RequestStatus::Pending);
    assert_eq!(offer.escrow.status, EscrowStatus::Held);
    assert_eq!(offer.escrow.amount, money(1_200));

    let approved = offers::approve_offer(&db, offer.request.id, owner.id).await.unwrap();
    assert_eq!(approved.request.status, RequestStatus::Active);
    assert_eq!(approved.escrow.status, EscrowStatus::Released);

    let record = reload_campaign(&db, record.id).await;
    assert_eq!(record.status, CampaignStatus::Active);
    assert_eq!(record.current_funding, money(1_200));
    assert_eq!(reload_tier(&db, tier.id).await.current_sponsors, 1);

    // Double approval is a conflict, not a second release.
    let err = offers::approve_offer(&db, offer.request.id, owner.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");
}

#[tokio::test]
async fn rejecting_custom_offer_refunds_and_leaves_funding_untouched() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, Some(1)).await;
    let sponsor = register(&db, "Globex Energy", ProfileType::Sponsor).await;

    let offer = pending_offer(&db, &sponsor, &record, None, 2_000).await;
    let rejected = offers::reject_offer(&db, offer.request.id, owner.id).await.unwrap();
    assert_eq!(rejected.request.status, RequestStatus::Rejected);
    assert_eq!(rejected.escrow.status, EscrowStatus::Refunded);

    let record = reload_campaign(&db, record.id).await;
    assert_eq!(record.current_funding, money(0));
    assert_eq!(record.status, CampaignStatus::Open);
}

#[tokio::test]
async fn reject_and_cancel_are_idempotent_without_double_refund() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    let offer = pending_offer(&db, &sponsor, &record, None, 300).await;
    let first = offers::reject_offer(&db, offer.request.id, owner.id).await.unwrap();
    let second = offers::reject_offer(&db, offer.request.id, owner.id).await.unwrap();
    assert_eq!(first.request.status, RequestStatus::Rejected);
    assert_eq!(second.request.status, RequestStatus::Rejected);
    assert_eq!(second.escrow.status, EscrowStatus::Refunded);

    // A rejected offer cannot be approved or cancelled afterwards.
    let err = offers::approve_offer(&db, offer.request.id, owner.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");
    let err = offers::cancel_offer(&db, offer.request.id, sponsor.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");

    // Sponsor-side cancellation behaves the same way.
    let offer = pending_offer(&db, &sponsor, &record, None, 400).await;
    let first = offers::cancel_offer(&db, offer.request.id, sponsor.id).await.unwrap();
    let second = offers::cancel_offer(&db, offer.request.id, sponsor.id).await.unwrap();
    assert_eq!(first.request.status, RequestStatus::Cancelled);
    assert_eq!(second.request.status, RequestStatus::Cancelled);
    assert_eq!(second.escrow.status, EscrowStatus::Refunded);
}

#[tokio::test]
async fn transitions_require_the_right_actor() {
    let db = setup_db().await;
    let owner = register(&db, "Riverton FC", ProfileType::Team).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;
    let bystander = register(&db, "Initech Capital", ProfileType::Sponsor).await;

    let offer = pending_offer(&db, &sponsor, &record, None, 500).await;

    let err = offers::approve_offer(&db, offer.request.id, sponsor.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err}");
    let err = offers::reject_offer(&db, offer.request.id, bystander.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err}");
    let err = offers::cancel_offer(&db, offer.request.id, owner.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err}");

    // Still PENDING and HELD after all the failed attempts.
    let unchanged = offers::offer_with_escrow(&db, offer.request.id).await.unwrap();
    assert_eq!(unchanged.request.status, RequestStatus::Pending);
    assert_eq!(unchanged.escrow.status, EscrowStatus::Held);
}

#[tokio::test]
async fn submission_validates_tier_amount_and_recipient() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, Some(1)).await;
    let other_owner = register(&db, "Riverton FC", ProfileType::Team).await;
    let (other_record, other_tier) = campaign_with_tier(&db, &other_owner, 2_000, 200, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    let submit = |campaign_id, recipient_id, tier_id, value: i64| {
        offers::submit_offer(
            &db,
            offers::NewOffer {
                campaign_id,
                sponsor_id: sponsor.id,
                recipient_id,
                perk_tier_id: tier_id,
                amount: money(value),
                is_custom: false,
                custom_perks: None,
                message: None,
            },
        )
    };

    // Below the tier price.
    let err = submit(record.id, owner.id, Some(tier.id), 999).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    // Non-positive amount.
    let err = submit(record.id, owner.id, None, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    // Tier belonging to a different campaign.
    let err = submit(record.id, owner.id, Some(other_tier.id), 1_000).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    // Unknown tier and unknown campaign.
    let err = submit(record.id, owner.id, Some(Uuid::new_v4()), 1_000).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err}");
    let err = submit(Uuid::new_v4(), owner.id, None, 1_000).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err}");

    // Recipient that does not own the campaign.
    let err = submit(record.id, other_owner.id, None, 1_000).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    let _ = other_record;
}

#[tokio::test]
async fn campaign_creation_rejects_bad_input() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    let base = || store::NewCampaign {
        title: "Road to the nationals".to_string(),
        description: String::new(),
        goal_amount: money(5_000),
        deadline: Utc::now() + Duration::days(30),
        tiers: Vec::new(),
    };

    let mut input = base();
    input.goal_amount = money(0);
    let err = store::create_campaign(&db, &owner, input).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    let mut input = base();
    input.deadline = Utc::now() - Duration::hours(1);
    let err = store::create_campaign(&db, &owner, input).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    let mut input = base();
    input.tiers = vec![store::NewPerkTier {
        name: "Broken".to_string(),
        description: String::new(),
        amount: money(0),
        max_sponsors: None,
    }];
    let err = store::create_campaign(&db, &owner, input).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    let mut input = base();
    input.tiers = vec![store::NewPerkTier {
        name: "Broken".to_string(),
        description: String::new(),
        amount: money(100),
        max_sponsors: Some(-1),
    }];
    let err = store::create_campaign(&db, &owner, input).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)), "got {err}");

    // Sponsors cannot own campaigns at all.
    let err = store::create_campaign(&db, &sponsor, base()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err}");
}

#[tokio::test]
async fn expiry_blocks_new_offers_but_not_pending_resolutions() {
    let db = setup_db().await;
    let owner = register(&db, "Marathon des Vignes", ProfileType::Event).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    // Offer submitted while the campaign was open.
    let early_offer = pending_offer(&db, &sponsor, &record, None, 700).await;

    // Push the deadline into the past, below goal.
    let mut active: campaign::ActiveModel = record.clone().into();
    active.deadline = Set(Utc::now() - Duration::days(1));
    active.update(&db).await.unwrap();

    // New submissions are refused and the campaign flips to EXPIRED.
    let err = offers::submit_offer(
        &db,
        offers::NewOffer {
            campaign_id: record.id,
            sponsor_id: sponsor.id,
            recipient_id: record.owner_id,
            perk_tier_id: None,
            amount: money(100),
            is_custom: true,
            custom_perks: None,
            message: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::CampaignNotAcceptingOffers(_)), "got {err}");
    assert_eq!(reload_campaign(&db, record.id).await.status, CampaignStatus::Expired);

    // The pre-expiry PENDING offer can still be approved.
    let approved = offers::approve_offer(&db, early_offer.request.id, owner.id).await.unwrap();
    assert_eq!(approved.request.status, RequestStatus::Active);
    let record = reload_campaign(&db, record.id).await;
    assert_eq!(record.current_funding, money(700));
    assert_eq!(record.status, CampaignStatus::Expired);
}

#[tokio::test]
async fn overfunding_is_allowed_and_completion_is_owner_confirmed() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 1_000, 100, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    // Completion below goal is refused.
    let err = aggregator::confirm_completed(&db, record.id, owner.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");

    let first = pending_offer(&db, &sponsor, &record, None, 800).await;
    offers::approve_offer(&db, first.request.id, owner.id).await.unwrap();
    let second = pending_offer(&db, &sponsor, &record, None, 800).await;
    offers::approve_offer(&db, second.request.id, owner.id).await.unwrap();

    // Totals may exceed the goal; the campaign keeps accepting offers.
    let funded = reload_campaign(&db, record.id).await;
    assert_eq!(funded.current_funding, money(1_600));
    assert_eq!(funded.status, CampaignStatus::Active);

    let completed = aggregator::confirm_completed(&db, record.id, owner.id).await.unwrap();
    assert_eq!(completed.status, CampaignStatus::Completed);
    // Confirming again is a no-op.
    let again = aggregator::confirm_completed(&db, record.id, owner.id).await.unwrap();
    assert_eq!(again.status, CampaignStatus::Completed);

    // A completed campaign refuses new offers.
    let err = offers::submit_offer(
        &db,
        offers::NewOffer {
            campaign_id: record.id,
            sponsor_id: sponsor.id,
            recipient_id: record.owner_id,
            perk_tier_id: None,
            amount: money(100),
            is_custom: true,
            custom_perks: None,
            message: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::CampaignNotAcceptingOffers(_)), "got {err}");
}

#[tokio::test]
async fn cancelling_a_campaign_rejects_and_refunds_pending_offers() {
    let db = setup_db().await;
    let owner = register(&db, "Riverton FC", ProfileType::Team).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;
    let outsider = register(&db, "Globex Energy", ProfileType::Sponsor).await;

    let settled = pending_offer(&db, &sponsor, &record, None, 1_000).await;
    offers::approve_offer(&db, settled.request.id, owner.id).await.unwrap();
    let pending_a = pending_offer(&db, &sponsor, &record, None, 200).await;
    let pending_b = pending_offer(&db, &outsider, &record, None, 300).await;

    let err = aggregator::cancel_campaign(&db, record.id, outsider.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "got {err}");

    let cancelled = aggregator::cancel_campaign(&db, record.id, owner.id).await.unwrap();
    assert_eq!(cancelled.status, CampaignStatus::Cancelled);

    for id in [pending_a.request.id, pending_b.request.id] {
        let resolved = offers::offer_with_escrow(&db, id).await.unwrap();
        assert_eq!(resolved.request.status, RequestStatus::Rejected);
        assert_eq!(resolved.escrow.status, EscrowStatus::Refunded);
    }
    // The approved offer is settled history and stays ACTIVE/RELEASED.
    let settled = offers::offer_with_escrow(&db, settled.request.id).await.unwrap();
    assert_eq!(settled.request.status, RequestStatus::Active);
    assert_eq!(settled.escrow.status, EscrowStatus::Released);

    // Cancelling again is a no-op; new offers are refused.
    let again = aggregator::cancel_campaign(&db, record.id, owner.id).await.unwrap();
    assert_eq!(again.status, CampaignStatus::Cancelled);
    let err = offers::submit_offer(
        &db,
        offers::NewOffer {
            campaign_id: record.id,
            sponsor_id: sponsor.id,
            recipient_id: record.owner_id,
            perk_tier_id: None,
            amount: money(50),
            is_custom: true,
            custom_perks: None,
            message: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::CampaignNotAcceptingOffers(_)), "got {err}");
}

#[tokio::test]
async fn recomputation_repairs_drifted_funding() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    let offer = pending_offer(&db, &sponsor, &record, None, 1_000).await;
    offers::approve_offer(&db, offer.request.id, owner.id).await.unwrap();

    // Simulate drift from an out-of-band write.
    let mut active: campaign::ActiveModel = reload_campaign(&db, record.id).await.into();
    active.current_funding = Set(money(9_999));
    active.update(&db).await.unwrap();

    let repaired = aggregator::recompute_campaign_status(&db, record.id).await.unwrap();
    assert_eq!(repaired.current_funding, money(1_000));
    assert_eq!(repaired.status, CampaignStatus::Active);
}

#[tokio::test]
async fn reconciliation_job_expires_overdue_campaigns() {
    let db = setup_db().await;
    let owner = register(&db, "Marathon des Vignes", ProfileType::Event).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;

    let mut active: campaign::ActiveModel = record.clone().into();
    active.deadline = Set(Utc::now() - Duration::days(2));
    active.update(&db).await.unwrap();

    run_funding_reconciliation(Some(&db)).await.unwrap();
    assert_eq!(reload_campaign(&db, record.id).await.status, CampaignStatus::Expired);

    // Without a database handle the job is a quiet no-op.
    run_funding_reconciliation(None).await.unwrap();
}

#[tokio::test]
async fn unlimited_tiers_always_admit_and_release_never_goes_negative() {
    let db = setup_db().await;
    let owner = register(&db, "Riverton FC", ProfileType::Team).await;
    let (record, tier) = campaign_with_tier(&db, &owner, 10_000, 100, None).await;

    for i in 0..3 {
        let sponsor = register(&db, &format!("Sponsor {i}"), ProfileType::Sponsor).await;
        let offer = pending_offer(&db, &sponsor, &record, Some(tier.id), 100).await;
        offers::approve_offer(&db, offer.request.id, owner.id).await.unwrap();
    }
    assert_eq!(reload_tier(&db, tier.id).await.current_sponsors, 3);

    // Administrative slot release, then drain past zero: the counter
    // bottoms out at zero.
    for _ in 0..5 {
        tiers::release_tier_slot(&db, tier.id).await.unwrap();
    }
    assert_eq!(reload_tier(&db, tier.id).await.current_sponsors, 0);

    let err = tiers::release_tier_slot(&db, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err}");
}

#[tokio::test]
async fn directory_resolves_profiles_and_owners() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;

    assert!(directory::profile_exists(&db, owner.id, ProfileType::Athlete).await.unwrap());
    assert!(!directory::profile_exists(&db, owner.id, ProfileType::Team).await.unwrap());
    assert!(!directory::profile_exists(&db, Uuid::new_v4(), ProfileType::Athlete).await.unwrap());

    assert_eq!(directory::owner_of(&db, record.id).await.unwrap(), owner.id);
    let err = directory::owner_of(&db, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err}");
}

#[tokio::test]
async fn escrow_ledger_is_idempotent_and_rejects_cross_transitions() {
    let db = setup_db().await;
    let owner = register(&db, "Avery Quinn", ProfileType::Athlete).await;
    let (record, _tier) = campaign_with_tier(&db, &owner, 5_000, 1_000, None).await;
    let sponsor = register(&db, "Acme Sportswear", ProfileType::Sponsor).await;

    // Ledger-level contract, exercised against a real offer's entry.
    let offer = pending_offer(&db, &sponsor, &record, None, 250).await;
    let released = escrow::release(&db, offer.request.id).await.unwrap();
    assert_eq!(released.status, EscrowStatus::Released);
    let released_again = escrow::release(&db, offer.request.id).await.unwrap();
    assert_eq!(released_again.status, EscrowStatus::Released);

    let err = escrow::refund(&db, offer.request.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");

    let err = escrow::release(&db, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err}");

    let other = pending_offer(&db, &sponsor, &record, None, 125).await;
    let refunded = escrow::refund(&db, other.request.id).await.unwrap();
    assert_eq!(refunded.status, EscrowStatus::Refunded);
    let refunded_again = escrow::refund(&db, other.request.id).await.unwrap();
    assert_eq!(refunded_again.status, EscrowStatus::Refunded);
    let err = escrow::release(&db, other.request.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)), "got {err}");
}
