//! Test helpers: a scripted indicator source in place of the network

#![allow(dead_code)]

use async_trait::async_trait;
use esg_common::config::EngineConfig;
use esg_engine::catalog::IndicatorCatalog;
use esg_engine::services::{FetchFailure, IndicatorSource, Observation};
use esg_engine::EsgEngine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted answer for one (entity, indicator) pair
#[derive(Debug, Clone)]
pub enum Scripted {
    Value(f64),
    NoData,
    Fail(FetchFailure),
}

/// Indicator source answering from a table
///
/// Pairs not in the table answer "no data". Every call is counted and
/// recorded; an optional per-pair delay controls completion order. The
/// highest number of simultaneously running calls is tracked as `peak`.
#[derive(Default)]
pub struct ScriptedSource {
    answers: HashMap<(String, String), Scripted>,
    delays: HashMap<(String, String), Duration>,
    default_delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<(String, String)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: &str, code: &str, answer: Scripted) -> Self {
        self.answers.insert((entity.to_string(), code.to_string()), answer);
        self
    }

    pub fn value(self, entity: &str, code: &str, value: f64) -> Self {
        self.with(entity, code, Scripted::Value(value))
    }

    pub fn delayed(mut self, entity: &str, code: &str, delay: Duration) -> Self {
        self.delays.insert((entity.to_string(), code.to_string()), delay);
        self
    }

    /// Delay applied to pairs without their own delay
    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndicatorSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn latest_value(
        &self,
        entity_id: &str,
        indicator_code: &str,
    ) -> Result<Option<Observation>, FetchFailure> {
        let key = (entity_id.to_string(), indicator_code.to_string());
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(key.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&key).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.answers.get(&key) {
            Some(Scripted::Value(value)) => Ok(Some(Observation {
                year: Some(2022),
                value: *value,
            })),
            Some(Scripted::NoData) | None => Ok(None),
            Some(Scripted::Fail(failure)) => Err(failure.clone()),
        }
    }
}

/// Engine on the built-in catalog and a scripted source
pub fn engine_with(source: Arc<ScriptedSource>) -> EsgEngine {
    engine_with_config(EngineConfig::default(), source)
}

pub fn engine_with_config(config: EngineConfig, source: Arc<ScriptedSource>) -> EsgEngine {
    EsgEngine::new(config, Arc::new(IndicatorCatalog::builtin()), source)
}
