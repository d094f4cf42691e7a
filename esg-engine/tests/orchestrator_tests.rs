//! Fetch orchestrator tests against a scripted indicator source

mod helpers;

use esg_common::events::{AnalysisMode, BusEvent, SelectionBus, SelectionState, Topic};
use esg_engine::catalog::IndicatorCatalog;
use esg_engine::error::{EngineError, MissingSelection};
use esg_engine::services::{FetchFailure, FetchOrchestrator};
use helpers::{Scripted, ScriptedSource};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn selection(parameters: &[&str], entities: &[&str]) -> SelectionState {
    SelectionState {
        parameters: parameters.iter().map(|s| s.to_string()).collect(),
        entities: entities.iter().map(|s| s.to_string()).collect(),
        analysis_mode: AnalysisMode::Comprehensive,
    }
}

fn orchestrator(
    source: Arc<ScriptedSource>,
    bus: &SelectionBus,
    max_concurrent: Option<usize>,
) -> FetchOrchestrator {
    FetchOrchestrator::new(
        source,
        Arc::new(IndicatorCatalog::builtin()),
        bus.clone(),
        max_concurrent,
    )
}

/// Collects every fetch-progress event as (completed, total)
fn record_progress(bus: &SelectionBus) -> (Arc<Mutex<Vec<(usize, usize)>>>, esg_common::events::Subscription) {
    let progress = Arc::new(Mutex::new(Vec::new()));
    let progress_clone = Arc::clone(&progress);
    let subscription = bus.subscribe(Topic::FetchProgress, move |event| {
        if let BusEvent::FetchProgress { completed, total, .. } = event {
            progress_clone.lock().unwrap().push((*completed, *total));
        }
    });
    (progress, subscription)
}

#[tokio::test]
async fn test_empty_selection_issues_no_requests() {
    let source = Arc::new(ScriptedSource::new());
    let bus = SelectionBus::new(16);
    let (progress, _sub) = record_progress(&bus);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    let no_entities = orchestrator
        .fetch(&selection(&["Rule of Law"], &[]), 1)
        .await;
    assert!(matches!(
        no_entities,
        Err(EngineError::EmptySelection { missing: MissingSelection::Entities })
    ));

    let no_parameters = orchestrator.fetch(&selection(&[], &["USA"]), 2).await;
    assert!(matches!(
        no_parameters,
        Err(EngineError::EmptySelection { missing: MissingSelection::Parameters })
    ));

    let nothing = orchestrator.fetch(&selection(&[], &[]), 3).await;
    assert!(matches!(nothing, Err(EngineError::EmptySelection { .. })));

    assert_eq!(source.call_count(), 0);
    assert!(progress.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_one_failed_request_does_not_fail_the_batch() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("NOR", "EN.ATM.CO2E.PC", 8.0)
            .with(
                "NOR",
                "AG.LND.FRST.ZS",
                Scripted::Fail(FetchFailure::Http(502)),
            )
            .value("NOR", "SP.DYN.LE00.IN", 83.0)
            .value("NOR", "SE.ADT.LITR.ZS", 99.0)
            .value("NOR", "CC.EST", 2.0)
            .value("NOR", "RL.EST", 1.9),
    );
    let bus = SelectionBus::new(64);
    let (progress, _sub) = record_progress(&bus);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    let outcome = orchestrator
        .fetch(
            &selection(
                &[
                    "CO2 Emissions per Capita",
                    "Forest Area (% of land)",
                    "Life Expectancy",
                    "Literacy Rate (%)",
                    "Control of Corruption",
                    "Rule of Law",
                ],
                &["NOR"],
            ),
            7,
        )
        .await
        .expect("partial failure is not an error");

    assert_eq!(source.call_count(), 6);
    assert_eq!(outcome.stats.total, 6);
    assert_eq!(outcome.stats.succeeded, 5);
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(outcome.observations.len(), 6);

    let failed = outcome
        .observations
        .iter()
        .find(|o| o.indicator_code == "AG.LND.FRST.ZS")
        .unwrap();
    assert_eq!(failed.value, None);

    let progress = progress.lock().unwrap();
    assert_eq!(progress.first(), Some(&(0, 6)));
    assert_eq!(progress.last(), Some(&(6, 6)));
    assert!(progress.windows(2).all(|w| w[0].0 <= w[1].0), "progress never decreases");
    assert_eq!(
        progress.iter().filter(|(completed, total)| completed == total).count(),
        1,
        "100% is reported once, after the last request"
    );
}

#[tokio::test]
async fn test_synonym_labels_fetch_once_per_entity() {
    let source = Arc::new(ScriptedSource::new());
    let bus = SelectionBus::new(16);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    // "Control Index" fuzzy-matches "Control of Corruption" (CC.EST)
    let outcome = orchestrator
        .fetch(
            &selection(&["Control of Corruption", "Control Index"], &["USA", "CAN"]),
            1,
        )
        .await
        .unwrap();

    assert_eq!(outcome.resolved.len(), 2);
    assert_eq!(outcome.stats.total, 2);
    let mut calls = source.calls();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            ("CAN".to_string(), "CC.EST".to_string()),
            ("USA".to_string(), "CC.EST".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unresolvable_parameters_publish_empty_progress() {
    let source = Arc::new(ScriptedSource::new());
    let bus = SelectionBus::new(16);
    let (progress, _sub) = record_progress(&bus);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    let outcome = orchestrator
        .fetch(&selection(&["Zzyzx Quotient"], &["USA"]), 1)
        .await
        .unwrap();

    assert_eq!(source.call_count(), 0);
    assert_eq!(outcome.unresolved, vec!["Zzyzx Quotient".to_string()]);
    assert!(outcome.observations.is_empty());
    assert_eq!(*progress.lock().unwrap(), vec![(0, 0)]);
}

#[tokio::test]
async fn test_no_data_and_non_finite_values() {
    let source = Arc::new(
        ScriptedSource::new()
            .with("USA", "CC.EST", Scripted::NoData)
            .value("USA", "RL.EST", f64::NAN),
    );
    let bus = SelectionBus::new(16);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    let outcome = orchestrator
        .fetch(&selection(&["Control of Corruption", "Rule of Law"], &["USA"]), 1)
        .await
        .unwrap();

    assert_eq!(outcome.stats.no_data, 2);
    assert_eq!(outcome.stats.succeeded, 0);
    assert!(outcome.observations.iter().all(|o| o.value.is_none()));
}

#[tokio::test]
async fn test_results_independent_of_completion_order() {
    let build = |slow: &str| {
        Arc::new(
            ScriptedSource::new()
                .value("USA", "CC.EST", 0.5)
                .value("BRA", "CC.EST", -0.5)
                .value("DEU", "CC.EST", 1.5)
                .delayed(slow, "CC.EST", Duration::from_millis(50)),
        )
    };
    let sel = selection(&["Control of Corruption"], &["USA", "BRA", "DEU"]);

    let bus = SelectionBus::new(16);
    let first = orchestrator(build("USA"), &bus, None).fetch(&sel, 1).await.unwrap();
    let second = orchestrator(build("DEU"), &bus, None).fetch(&sel, 2).await.unwrap();

    assert_eq!(first.observations, second.observations);
    let entities: Vec<_> = first.observations.iter().map(|o| o.entity_id.as_str()).collect();
    assert_eq!(entities, vec!["BRA", "DEU", "USA"]);
}

#[tokio::test]
async fn test_concurrency_cap_limits_requests_in_flight() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("USA", "CC.EST", 0.0)
            .value("USA", "RL.EST", 0.0)
            .value("CAN", "CC.EST", 0.0)
            .value("CAN", "RL.EST", 0.0)
            .delay_all(Duration::from_millis(20)),
    );
    let bus = SelectionBus::new(16);
    let (progress, _sub) = record_progress(&bus);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, Some(1));

    let outcome = orchestrator
        .fetch(&selection(&["Control of Corruption", "Rule of Law"], &["USA", "CAN"]), 1)
        .await
        .unwrap();

    assert_eq!(source.peak_in_flight(), 1);
    assert_eq!(outcome.stats.succeeded, 4);
    assert_eq!(progress.lock().unwrap().last(), Some(&(4, 4)));
}

#[tokio::test]
async fn test_uncapped_fetch_runs_every_request_at_once() {
    let source = Arc::new(ScriptedSource::new().delay_all(Duration::from_millis(50)));
    let bus = SelectionBus::new(16);
    let orchestrator = orchestrator(Arc::clone(&source), &bus, None);

    let outcome = orchestrator
        .fetch(&selection(&["Control of Corruption", "Rule of Law"], &["USA", "CAN"]), 1)
        .await
        .unwrap();

    assert_eq!(outcome.stats.total, 4);
    assert_eq!(source.peak_in_flight(), 4);
}
