//! Safety monitor - field risk monitoring engine
//!
//! Runs a monitoring cycle on a fixed interval: the four evaluators fan out
//! concurrently, their findings fan in to the aggregator, then the alert
//! manager and emergency controller run on one path against that single
//! cycle. Only completed cycles are ever visible to readers.
//!
//! ```text
//!  ┌─────────┐ ┌───────────┐ ┌──────────┐ ┌───────────┐
//!  │ Weather │ │ Equipment │ │ Location │ │ Personnel │
//!  └────┬────┘ └─────┬─────┘ └────┬─────┘ └─────┬─────┘
//!       └────────────┴─────┬──────┴─────────────┘
//!                    ┌─────┴──────┐
//!                    │ Aggregator │──▶ Alerts ──▶ Emergency ──▶ Notify
//!                    └─────┬──────┘
//!                          └──▶ Remote assessment (detached)
//! ```
//!
//! At most one cycle runs at a time. A scheduled or weather-triggered tick
//! that finds a cycle in flight is skipped; a manual cycle waits its turn.

pub mod aggregator;
pub mod alerts;
pub mod assessment;
pub mod checklist;
pub mod cli;
pub mod emergency;
pub mod evaluators;
pub mod models;
pub mod notify;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AssessmentError, MonitorError};
use crate::sources::{
    CrewRoster, EquipmentTracker, GeoReference, LocationSource, WeatherSnapshot, WeatherSource,
};
use alerts::AlertManager;
use assessment::{AssessmentRequest, AssessmentResponse, HttpAssessor, RemoteAssessor};
use checklist::ChecklistGenerator;
use emergency::EmergencyController;
use evaluators::{
    run_evaluator, EquipmentEvaluator, LocationEvaluator, PersonnelEvaluator, WeatherEvaluator,
};
use models::*;
use notify::{LogSink, Notification, NotificationDispatcher, NotificationSink, WebhookSink};

/// Generated checklists kept for completion lookups
const MAX_CHECKLISTS: usize = 50;

/// Emergency subscribers that fall further behind than this lose events
const EMERGENCY_CHANNEL_CAPACITY: usize = 16;

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    Scheduled,
    WeatherChange,
    Manual,
}

/// The collaborators the monitor reads from
#[derive(Clone)]
pub struct MonitorSources {
    pub weather: Arc<dyn WeatherSource>,
    pub equipment: Arc<dyn EquipmentTracker>,
    pub location: Arc<dyn LocationSource>,
    pub geo: Option<Arc<dyn GeoReference>>,
    pub crew: Arc<dyn CrewRoster>,
}

impl MonitorSources {
    /// Use one object for weather, equipment, location and roster
    pub fn from_shared<S>(source: Arc<S>) -> Self
    where
        S: WeatherSource + EquipmentTracker + LocationSource + CrewRoster + 'static,
    {
        Self {
            weather: source.clone(),
            equipment: source.clone(),
            location: source.clone(),
            geo: None,
            crew: source,
        }
    }

    pub fn with_geo(mut self, geo: Arc<dyn GeoReference>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherSource>) -> Self {
        self.weather = weather;
        self
    }
}

/// Builds a [`SafetyMonitor`] with its injected capabilities
pub struct MonitorBuilder {
    config: Config,
    sources: MonitorSources,
    dispatcher: NotificationDispatcher,
    assessor: Option<Arc<dyn RemoteAssessor>>,
}

impl MonitorBuilder {
    pub fn new(config: Config, sources: MonitorSources) -> Self {
        Self {
            config,
            sources,
            dispatcher: NotificationDispatcher::new(),
            assessor: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.dispatcher = self.dispatcher.with_sink(sink);
        self
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn RemoteAssessor>) -> Self {
        self.assessor = Some(assessor);
        self
    }

    /// A configured webhook is added as a sink. With no sinks at all,
    /// notifications go to the log.
    pub fn build(self) -> SafetyMonitor {
        let MonitorBuilder {
            config,
            sources,
            mut dispatcher,
            assessor,
        } = self;

        if let Some(url) = &config.notifications.webhook_url {
            match WebhookSink::new(url.clone()) {
                Ok(sink) => dispatcher = dispatcher.with_sink(Arc::new(sink)),
                Err(e) => warn!(error = %e, "Webhook sink disabled"),
            }
        }
        if dispatcher.sink_count() == 0 {
            dispatcher = dispatcher.with_sink(Arc::new(LogSink));
        }

        let assessor = assessor.or_else(|| match HttpAssessor::from_config(&config.assessment) {
            Ok(http) => Some(Arc::new(http) as Arc<dyn RemoteAssessor>),
            Err(AssessmentError::Disabled) => None,
            Err(e) => {
                warn!(error = %e, "Remote assessment disabled");
                None
            }
        });

        let evaluators = Evaluators {
            weather: WeatherEvaluator::new(sources.weather),
            equipment: EquipmentEvaluator::new(sources.equipment, config.equipment.clone()),
            location: LocationEvaluator::new(sources.location, sources.geo),
            personnel: PersonnelEvaluator::new(sources.crew, config.crew.clone()),
        };
        let checklist = ChecklistGenerator::new(&config.checklist, config.crew.task_complexity);
        let engine = EmergencyController::new(
            config.monitor.emergency_threshold,
            config.monitor.emergency_cooldown_secs,
        );
        let (cycles_tx, _) = watch::channel(None);
        let (emergency_tx, _) = broadcast::channel(EMERGENCY_CHANNEL_CAPACITY);

        SafetyMonitor {
            inner: Arc::new(Inner {
                config,
                evaluators,
                checklist,
                dispatcher,
                assessor,
                engine: Mutex::new(engine),
                state: RwLock::new(MonitorState::default()),
                running: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                cycles_tx,
                emergency_tx,
                driver: Mutex::new(None),
            }),
        }
    }
}

struct Evaluators {
    weather: WeatherEvaluator,
    equipment: EquipmentEvaluator,
    location: LocationEvaluator,
    personnel: PersonnelEvaluator,
}

#[derive(Default)]
struct MonitorState {
    latest: Option<Arc<RiskAssessmentCycle>>,
    history: VecDeque<Arc<RiskAssessmentCycle>>,
    alerts: AlertManager,
    checklists: VecDeque<SafetyChecklist>,
    started_at: Option<DateTime<Utc>>,
    cycles_completed: u64,
    ticks_skipped: u64,
    emergency_state: ControllerState,
    last_emergency: Option<EmergencyEvent>,
    last_assessment: Option<AssessmentResponse>,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    config: Config,
    evaluators: Evaluators,
    checklist: ChecklistGenerator,
    dispatcher: NotificationDispatcher,
    assessor: Option<Arc<dyn RemoteAssessor>>,
    /// Held for the whole of a cycle; also serializes cycles
    engine: Mutex<EmergencyController>,
    state: RwLock<MonitorState>,
    running: AtomicBool,
    /// Set under the state write lock; nothing is published afterwards
    stopped: AtomicBool,
    cycles_tx: watch::Sender<Option<Arc<RiskAssessmentCycle>>>,
    emergency_tx: broadcast::Sender<EmergencyEvent>,
    driver: Mutex<Option<Driver>>,
}

impl Inner {
    /// Scheduled and push-triggered cycles never queue behind one in flight
    async fn try_cycle(self: &Arc<Self>, trigger: CycleTrigger) {
        let Ok(mut engine) = self.engine.try_lock() else {
            self.state.write().await.ticks_skipped += 1;
            debug!(trigger = ?trigger, "Cycle still in flight, skipping tick");
            return;
        };
        self.run_cycle(&mut engine, trigger).await;
    }

    async fn run_cycle(
        self: &Arc<Self>,
        engine: &mut EmergencyController,
        trigger: CycleTrigger,
    ) -> Option<Arc<RiskAssessmentCycle>> {
        let limit = self.config.monitor.source_timeout();
        let ev = &self.evaluators;

        let (weather, equipment, location, personnel) = tokio::join!(
            run_evaluator(&ev.weather, limit),
            run_evaluator(&ev.equipment, limit),
            run_evaluator(&ev.location, limit),
            run_evaluator(&ev.personnel, limit),
        );

        let snapshot = ConditionSnapshot {
            weather: weather.input,
            location: location.input.map(|ctx| ctx.coordinates),
            equipment: equipment.input,
            crew: personnel
                .input
                .map(|crew| crew.into_iter().filter(|m| m.active).collect())
                .unwrap_or_default(),
        };

        let mut factors = weather.factors;
        factors.extend(equipment.factors);
        factors.extend(location.factors);
        factors.extend(personnel.factors);

        let sources = vec![weather.report, equipment.report, location.report, personnel.report];
        let cycle = Arc::new(aggregator::assess(factors, snapshot, sources, Utc::now()));

        let (raised, emergency) = {
            let mut state = self.state.write().await;
            if self.stopped.load(Ordering::SeqCst) {
                debug!(cycle_id = %cycle.id, "Monitor stopped, discarding cycle");
                return None;
            }

            let raised = state.alerts.apply(&cycle);
            let emergency = engine.observe(&cycle);
            state.emergency_state = engine.state();
            if let Some(event) = &emergency {
                state.last_emergency = Some(event.clone());
            }

            state.latest = Some(Arc::clone(&cycle));
            state.history.push_back(Arc::clone(&cycle));
            while state.history.len() > self.config.monitor.history_size.max(1) {
                state.history.pop_front();
            }
            state.cycles_completed += 1;

            (raised, emergency)
        };

        let degraded = cycle.degraded_sources();
        info!(
            cycle_id = %cycle.id,
            trigger = ?trigger,
            score = cycle.overall_score,
            level = %cycle.overall_level,
            factors = cycle.factors.len(),
            new_alerts = raised.len(),
            degraded = ?degraded,
            "Monitoring cycle complete"
        );

        self.cycles_tx.send_replace(Some(Arc::clone(&cycle)));

        if let Some(event) = emergency {
            // No receivers is fine
            let _ = self.emergency_tx.send(event.clone());
            self.dispatcher.dispatch(Notification::Emergency(event));
        }
        for alert in raised {
            self.dispatcher.dispatch(Notification::Alert(alert));
        }

        self.spawn_assessment(&cycle);

        Some(cycle)
    }

    /// Detached; the result is stored only while the monitor is live
    fn spawn_assessment(self: &Arc<Self>, cycle: &RiskAssessmentCycle) {
        let Some(assessor) = self.assessor.clone() else {
            return;
        };
        let request = AssessmentRequest::from_cycle(&self.config.monitor.site_id, cycle);
        let inner = Arc::clone(self);

        tokio::spawn(async move {
            match assessor.assess(&request).await {
                Ok(response) => {
                    debug!(cycle_id = %response.cycle_id, "Remote assessment received");
                    let mut state = inner.state.write().await;
                    if !inner.stopped.load(Ordering::SeqCst) {
                        state.last_assessment = Some(response);
                    }
                }
                Err(e) => {
                    warn!(cycle_id = %request.cycle_id, error = %e, "Remote assessment failed");
                }
            }
        });
    }
}

/// Handle to a running or idle monitor. Cheap to clone.
#[derive(Clone)]
pub struct SafetyMonitor {
    inner: Arc<Inner>,
}

impl SafetyMonitor {
    pub fn builder(config: Config, sources: MonitorSources) -> MonitorBuilder {
        MonitorBuilder::new(config, sources)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Start the periodic driver
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut driver = self.inner.driver.lock().await;
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(MonitorError::Stopped);
        }
        if driver.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let period = self.inner.config.monitor.cycle_interval();
        let weather = self.inner.evaluators.weather.source().changes();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            site_id = %self.inner.config.monitor.site_id,
            interval_secs = period.as_secs(),
            push_weather = weather.is_some(),
            "Safety monitor started"
        );

        let handle = tokio::spawn(drive(Arc::downgrade(&self.inner), period, weather, shutdown_rx));
        *driver = Some(Driver {
            shutdown: shutdown_tx,
            handle,
        });

        self.inner.running.store(true, Ordering::SeqCst);
        self.inner.state.write().await.started_at = Some(Utc::now());
        Ok(())
    }

    /// Stop the driver. In-flight cycles finish but publish nothing.
    pub async fn stop(&self) {
        {
            let _state = self.inner.state.write().await;
            self.inner.stopped.store(true, Ordering::SeqCst);
        }
        self.inner.running.store(false, Ordering::SeqCst);

        let driver = self.inner.driver.lock().await.take();
        if let Some(driver) = driver {
            let _ = driver.shutdown.send(true);
            if let Err(e) = driver.handle.await {
                warn!(error = %e, "Monitor driver ended abnormally");
            }
        }
        info!("Safety monitor stopped");
    }

    /// Run one cycle now, waiting for any cycle in flight
    pub async fn trigger_manual_cycle(&self) -> Result<Arc<RiskAssessmentCycle>, MonitorError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(MonitorError::Stopped);
        }
        let mut engine = self.inner.engine.lock().await;
        self.inner
            .run_cycle(&mut engine, CycleTrigger::Manual)
            .await
            .ok_or(MonitorError::Stopped)
    }

    //=========================================================================
    // READERS
    //=========================================================================

    pub async fn current_risk_level(&self) -> RiskLevel {
        self.latest_cycle()
            .await
            .map(|c| c.overall_level)
            .unwrap_or_default()
    }

    pub async fn current_score(&self) -> f64 {
        self.latest_cycle()
            .await
            .map(|c| c.overall_score)
            .unwrap_or(0.0)
    }

    pub async fn latest_cycle(&self) -> Option<Arc<RiskAssessmentCycle>> {
        self.inner.state.read().await.latest.clone()
    }

    /// Newest first
    pub async fn recent_cycles(&self, count: usize) -> Vec<Arc<RiskAssessmentCycle>> {
        self.inner
            .state
            .read()
            .await
            .history
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect()
    }

    pub async fn active_alerts(&self) -> Vec<SafetyAlert> {
        self.inner.state.read().await.alerts.active().to_vec()
    }

    pub async fn last_emergency(&self) -> Option<EmergencyEvent> {
        self.inner.state.read().await.last_emergency.clone()
    }

    pub async fn last_assessment(&self) -> Option<AssessmentResponse> {
        self.inner.state.read().await.last_assessment.clone()
    }

    pub fn emergency_contacts(&self) -> &[EmergencyContact] {
        &self.inner.config.emergency_contacts
    }

    pub async fn status(&self) -> MonitorStatus {
        let state = self.inner.state.read().await;
        let latest = state.latest.as_ref();

        MonitorStatus {
            site_id: self.inner.config.monitor.site_id.clone(),
            running: self.inner.running.load(Ordering::SeqCst),
            started_at: state.started_at,
            last_cycle_at: latest.map(|c| c.timestamp),
            cycles_completed: state.cycles_completed,
            ticks_skipped: state.ticks_skipped,
            current_level: latest.map(|c| c.overall_level).unwrap_or_default(),
            current_score: latest.map(|c| c.overall_score).unwrap_or(0.0),
            active_alerts: state.alerts.active().len(),
            emergency_state: state.emergency_state,
            degraded_sources: latest
                .map(|c| c.degraded_sources().into_iter().map(String::from).collect())
                .unwrap_or_default(),
        }
    }

    //=========================================================================
    // HOST MUTATIONS
    //=========================================================================

    /// Dismiss one alert instance. Unknown ids are a no-op.
    pub async fn acknowledge_alert(&self, id: &str) -> bool {
        let acknowledged = self.inner.state.write().await.alerts.acknowledge(id);
        if acknowledged {
            info!(alert_id = %id, "Alert acknowledged");
        } else {
            debug!(alert_id = %id, "Acknowledged unknown alert, ignoring");
        }
        acknowledged
    }

    /// Build a checklist from the latest completed cycle
    pub async fn generate_checklist(&self) -> SafetyChecklist {
        let mut state = self.inner.state.write().await;
        let checklist = self
            .inner
            .checklist
            .generate(state.latest.as_deref(), Utc::now());

        state.checklists.push_back(checklist.clone());
        while state.checklists.len() > MAX_CHECKLISTS {
            state.checklists.pop_front();
        }

        info!(
            checklist_id = %checklist.id,
            items = checklist.items.len(),
            "Safety checklist generated"
        );
        checklist
    }

    /// Mark one checklist item complete. Unknown ids are a no-op.
    pub async fn complete_checklist_item(&self, checklist_id: &str, item_id: &str) -> bool {
        let mut state = self.inner.state.write().await;
        state
            .checklists
            .iter_mut()
            .find(|c| c.id == checklist_id)
            .map(|c| c.complete_item(item_id))
            .unwrap_or(false)
    }

    pub async fn checklist(&self, id: &str) -> Option<SafetyChecklist> {
        self.inner
            .state
            .read()
            .await
            .checklists
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    //=========================================================================
    // SUBSCRIPTIONS
    //=========================================================================

    pub fn subscribe_emergencies(&self) -> broadcast::Receiver<EmergencyEvent> {
        self.inner.emergency_tx.subscribe()
    }

    /// Receives each completed cycle
    pub fn subscribe_cycles(&self) -> watch::Receiver<Option<Arc<RiskAssessmentCycle>>> {
        self.inner.cycles_tx.subscribe()
    }

    /// Invoke `callback` for every emergency until the monitor is dropped
    pub fn on_emergency<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(EmergencyEvent) + Send + 'static,
    {
        let mut rx = self.subscribe_emergencies();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Emergency listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Periodic driver. Holds only a weak handle so dropping every
/// `SafetyMonitor` ends it.
async fn drive(
    weak: Weak<Inner>,
    period: Duration,
    mut weather: Option<watch::Receiver<Option<WeatherSnapshot>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let trigger = tokio::select! {
            _ = tick.tick() => CycleTrigger::Scheduled,
            changed = weather_changed(&mut weather) => {
                if !changed {
                    debug!("Weather feed closed, falling back to scheduled cycles");
                    weather = None;
                    continue;
                }
                CycleTrigger::WeatherChange
            }
            _ = shutdown.changed() => break,
        };

        let Some(inner) = weak.upgrade() else {
            break;
        };
        tokio::spawn(async move {
            inner.try_cycle(trigger).await;
        });
    }

    debug!("Monitor driver exited");
}

async fn weather_changed(rx: &mut Option<watch::Receiver<Option<WeatherSnapshot>>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}
