#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Demo walkthrough of the engine against in-memory stores: submit
//! reports, rebuild zones, then walk a subject into a hot cell and
//! watch the alert fan out.

use std::sync::Arc;

use chrono::{Duration, Utc};
use safewatch_alert::{AlertBroadcaster, AlertDispatcher, MemoryContactLookup, MockSmsNotifier};
use safewatch_area::memory::MemoryReportStore;
use safewatch_engine::RiskEngine;
use safewatch_models::{Contact, Coordinates, Position};
use safewatch_risk::MemoryWeightStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let store = Arc::new(MemoryReportStore::default());
    let contacts = Arc::new(MemoryContactLookup::new());
    contacts
        .add(
            "demo-subject",
            Contact {
                id: "c-1".to_string(),
                name: "Emergency contact".to_string(),
                phone: "+15550100".to_string(),
                is_primary: true,
            },
        )
        .await;
    let sms = Arc::new(MockSmsNotifier::new());
    let dispatcher = AlertDispatcher::new(
        AlertBroadcaster::default(),
        contacts,
        Arc::clone(&sms) as Arc<dyn safewatch_alert::Notifier>,
    );

    let engine = RiskEngine::new(store, Arc::new(MemoryWeightStore::default()), dispatcher).await?;
    let mut events = engine.subscribe();

    let now = Utc::now();
    let hot_cell = Coordinates::new(28.7041, 77.1025);

    println!("Submitting incident reports...");
    let submissions = [
        ("assault", "attacked near the market underpass"),
        ("harassment", "group shouting threats at passers-by"),
        ("stalking", "someone has been following me for blocks"),
    ];
    for (category, description) in submissions {
        let report = engine
            .submit_report(category, description, Some(hot_cell), now - Duration::hours(3))
            .await?;
        println!(
            "  {} -> risk {} (confidence {:.2})",
            category, report.risk_score, report.confidence
        );
        println!("    {}", report.explanation);
    }

    let zone_count = engine.rebuild_zones(now).await?;
    println!("\nClustered into {zone_count} active zone(s)");
    let index = engine.zone_index().await;
    if let Some(zone) = index.first_containing(hot_cell) {
        println!("{}", serde_json::to_string_pretty(zone)?);
    }

    println!("\nWalking demo-subject into the hot cell...");
    let position = Position {
        subject_id: "demo-subject".to_string(),
        coordinates: hot_cell,
        recorded_at: now,
    };
    if let Some(outcome) = engine.track_position(&position, now).await {
        println!(
            "Alert dispatched: {} subscriber(s), notification {:?}",
            outcome.subscribers_reached, outcome.notification
        );
    }
    if let Ok(event) = events.try_recv() {
        println!("Broadcast event:\n{}", serde_json::to_string_pretty(&event)?);
    }
    for (contact, message) in sms.sent().await {
        println!("SMS to {}: {message}", contact.phone);
    }

    Ok(())
}
