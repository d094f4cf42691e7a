//! End-to-end report cycle tests: selection → fetch → scores → report-ready

mod helpers;

use esg_common::config::EngineConfig;
use esg_common::events::{
    AnalysisMode, BusEvent, Priority, ScoreValue, Selection, SelectionState, Topic,
};
use esg_engine::error::EngineError;
use esg_engine::services::EmitOutcome;
use helpers::{engine_with, engine_with_config, Scripted, ScriptedSource};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn selection(parameters: &[&str], entities: &[&str]) -> SelectionState {
    SelectionState {
        parameters: parameters.iter().map(|s| s.to_string()).collect(),
        entities: entities.iter().map(|s| s.to_string()).collect(),
        analysis_mode: AnalysisMode::Comprehensive,
    }
}

#[tokio::test]
async fn test_report_from_store_selection() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("SWE", "EG.FEC.RNEW.ZS", 55.0)
            .value("SWE", "SP.DYN.LE00.IN", 75.0)
            .value("SWE", "GE.EST", 1.5),
    );
    let engine = engine_with(Arc::clone(&source));

    let reports = Arc::new(Mutex::new(Vec::new()));
    let reports_clone = Arc::clone(&reports);
    let _sub = engine.bus().subscribe(Topic::ReportReady, move |event| {
        if let BusEvent::ReportReady { report } = event {
            reports_clone.lock().unwrap().push(Arc::clone(report));
        }
    });

    let store = engine.store();
    store.set(Selection::Parameter("Renewable Energy (%)".into()));
    store.set(Selection::Parameter("Life Expectancy".into()));
    store.set(Selection::Parameter("Government Effectiveness".into()));
    store.set(Selection::Entity("SWE".into()));

    let outcome = engine.generate_report().await.unwrap();
    let report = outcome.report().expect("published").clone();

    let swe = &report.entity_scores[0];
    assert_eq!(swe.display_name, "Sweden");
    assert_eq!(swe.environmental, ScoreValue::Value(55));
    assert_eq!(swe.social, ScoreValue::Value(75));
    assert_eq!(swe.governance, ScoreValue::Value(80));
    assert_eq!(swe.overall, ScoreValue::Value(70));

    // Only the environmental rule fires
    assert_eq!(report.recommendations.len(), 1);
    assert_eq!(
        report.recommendations[0].text,
        "Improve environmental sustainability measures"
    );
    assert_eq!(report.recommendations[0].priority, Priority::High);

    assert_eq!(report.source_meta.source, "scripted");
    assert_eq!(report.source_meta.total_requests, 3);
    assert_eq!(report.source_meta.resolved_indicators.len(), 3);

    let published = reports.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert!(Arc::ptr_eq(&published[0], &report));
    assert!(Arc::ptr_eq(&engine.current_report().unwrap(), &report));
}

#[tokio::test]
async fn test_empty_store_selection_is_rejected() {
    let source = Arc::new(ScriptedSource::new());
    let engine = engine_with(Arc::clone(&source));
    engine.store().set(Selection::Entity("USA".into()));

    let result = engine.generate_report().await;

    assert!(matches!(result, Err(EngineError::EmptySelection { .. })));
    assert_eq!(source.call_count(), 0);
    assert!(engine.current_report().is_none());
}

#[tokio::test]
async fn test_missing_category_reported_as_no_data() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("IND", "CC.EST", 0.0)
            .with("IND", "SP.DYN.LE00.IN", Scripted::NoData),
    );
    let engine = engine_with(source);

    let outcome = engine
        .generate_for(&selection(&["Control of Corruption", "Life Expectancy"], &["IND"]))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    let ind = &report.entity_scores[0];
    assert_eq!(ind.governance, ScoreValue::Value(50));
    assert_eq!(ind.social, ScoreValue::NoData);
    assert_eq!(ind.environmental, ScoreValue::NoData);
    // Overall is the governance score alone, not diluted by missing categories
    assert_eq!(ind.overall, ScoreValue::Value(50));

    assert_eq!(report.overall.social, ScoreValue::NoData);
    // Missing social data triggers no social recommendation
    assert!(report
        .recommendations
        .iter()
        .all(|r| r.text != "Enhance social development programs"));
}

#[tokio::test]
async fn test_no_scorable_data_report() {
    let source = Arc::new(ScriptedSource::new().with(
        "USA",
        "CC.EST",
        Scripted::Fail(esg_engine::services::FetchFailure::Network("down".into())),
    ));
    let engine = engine_with(source);

    let outcome = engine
        .generate_for(&selection(&["Control of Corruption"], &["USA"]))
        .await
        .unwrap();
    let report = outcome.report().unwrap();

    assert!(!report.has_scores());
    assert_eq!(report.entity_scores[0].overall, ScoreValue::NoData);
    assert!(report.recommendations.is_empty());
    assert_eq!(report.source_meta.failed_requests, 1);
}

#[tokio::test]
async fn test_quick_mode_limits_selection() {
    let source = Arc::new(ScriptedSource::new());
    let engine = engine_with(Arc::clone(&source));

    let mut sel = selection(
        &["Rule of Law", "Life Expectancy", "CO2 Emissions per Capita", "Forest Area (% of land)"],
        &["USA", "BRA", "DEU"],
    );
    sel.analysis_mode = AnalysisMode::Quick;

    let outcome = engine.generate_for(&sel).await.unwrap();
    let report = outcome.report().unwrap();

    // First 3 parameters, first 2 entities
    assert_eq!(source.call_count(), 6);
    assert_eq!(report.selection.parameters.len(), 3);
    let entities: Vec<_> = report.selection.entities.iter().cloned().collect();
    assert_eq!(entities, vec!["BRA".to_string(), "DEU".to_string()]);
    assert_eq!(report.source_meta.analysis_mode, AnalysisMode::Quick);
}

#[tokio::test]
async fn test_entity_cap() {
    let source = Arc::new(ScriptedSource::new());
    let config = EngineConfig {
        max_entities: Some(2),
        ..EngineConfig::default()
    };
    let engine = engine_with_config(config, Arc::clone(&source));

    let outcome = engine
        .generate_for(&selection(&["Rule of Law"], &["USA", "CAN", "MEX", "BRA"]))
        .await
        .unwrap();

    assert_eq!(source.call_count(), 2);
    assert_eq!(outcome.report().unwrap().entity_scores.len(), 2);
}

#[tokio::test]
async fn test_stale_cycle_does_not_publish() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("USA", "CC.EST", 1.0)
            .delayed("USA", "CC.EST", Duration::from_millis(300))
            .value("CAN", "CC.EST", 1.5),
    );
    let engine = engine_with(source);

    let published = Arc::new(Mutex::new(Vec::new()));
    let published_clone = Arc::clone(&published);
    let _sub = engine.bus().subscribe(Topic::ReportReady, move |event| {
        if let BusEvent::ReportReady { report } = event {
            published_clone.lock().unwrap().push(report.cycle_id);
        }
    });

    let slow = selection(&["Control of Corruption"], &["USA"]);
    let fast = selection(&["Control of Corruption"], &["CAN"]);

    // Cycle 1 starts first and finishes last
    let (first, second) = tokio::join!(engine.generate_for(&slow), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        engine.generate_for(&fast).await
    });

    let second = second.unwrap();
    let second_id = second.report().expect("newer cycle publishes").cycle_id;
    assert!(matches!(
        first.unwrap(),
        EmitOutcome::Stale { cycle_id, last_published } if cycle_id < second_id && last_published == second_id
    ));

    assert_eq!(*published.lock().unwrap(), vec![second_id]);
    assert_eq!(engine.current_report().unwrap().cycle_id, second_id);
}

#[tokio::test]
async fn test_selection_events_carry_snapshots() {
    let engine = engine_with(Arc::new(ScriptedSource::new()));
    let events = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<_> = [
        Topic::ParametersChanged,
        Topic::EntitiesChanged,
        Topic::AnalysisTypeChanged,
    ]
    .into_iter()
    .map(|topic| {
        let events = Arc::clone(&events);
        engine.bus().subscribe(topic, move |event| {
            events
                .lock()
                .unwrap()
                .push((event.topic(), Arc::clone(event.selection().unwrap())));
        })
    })
    .collect();

    engine.store().set(Selection::Parameter("Rule of Law".into()));
    engine.store().set(Selection::Entity("JPN".into()));
    engine.store().set(Selection::AnalysisMode(AnalysisMode::Quick));

    let events = events.lock().unwrap();
    let topics: Vec<_> = events.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        topics,
        vec![
            Topic::ParametersChanged,
            Topic::EntitiesChanged,
            Topic::AnalysisTypeChanged
        ]
    );
    assert!(events[0].1.entities.is_empty());
    assert!(events[1].1.entities.contains("JPN"));
    assert_eq!(events[2].1.analysis_mode, AnalysisMode::Quick);
    drop(subs);
}

#[tokio::test]
async fn test_failed_request_leaves_remaining_scores_intact() {
    let source = Arc::new(
        ScriptedSource::new()
            .value("NOR", "EN.ATM.CO2E.PC", 8.0)
            .with(
                "NOR",
                "AG.LND.FRST.ZS",
                Scripted::Fail(esg_engine::services::FetchFailure::Http(502)),
            )
            .value("NOR", "SP.DYN.LE00.IN", 80.0)
            .value("NOR", "SE.ADT.LITR.ZS", 96.0)
            .value("NOR", "CC.EST", 0.0)
            .value("NOR", "RL.EST", 0.5),
    );
    let engine = engine_with(source);

    let outcome = engine
        .generate_for(&selection(
            &[
                "CO2 Emissions per Capita",
                "Forest Area (% of land)",
                "Life Expectancy",
                "Literacy Rate (%)",
                "Control of Corruption",
                "Rule of Law",
            ],
            &["NOR"],
        ))
        .await
        .expect("one failed request does not fail the cycle");
    let report = outcome.report().unwrap();

    assert_eq!(report.source_meta.total_requests, 6);
    assert_eq!(report.source_meta.failed_requests, 1);

    let nor = &report.entity_scores[0];
    // Environmental is the CO2 value alone; the failed forest request adds nothing
    assert_eq!(nor.environmental, ScoreValue::Value(8));
    assert_eq!(nor.social, ScoreValue::Value(88));
    assert_eq!(nor.governance, ScoreValue::Value(55));
    // (8 + 88 + 55) / 3 at full precision
    assert_eq!(nor.overall, ScoreValue::Value(50));
}
