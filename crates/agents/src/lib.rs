use std::sync::Arc;
use std::time::{Duration, Instant};

use gotham_core::{
    build_trip_plan, format_itinerary, FormatWarning, Itinerary, PlanError, PlannerOptions,
    TripPlan, TripRequest,
};
use gotham_data::{DatasetRepository, StoreError};
use gotham_llm::{ConnectivityReport, ModelClient, ModelError};
use gotham_observability::AppMetrics;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AgentError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(StoreError::Missing(_)) => "MissingDatasetError",
            Self::Store(_) => "StoreError",
            Self::Plan(err) => err.kind(),
            Self::Model(err) => err.kind(),
        }
    }
}

/// Everything one planning run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub run_id: Uuid,
    pub plan: TripPlan,
    pub itinerary: Itinerary,
    pub warning: Option<FormatWarning>,
}

/// Drives store, planner, model and formatter for one request at a time.
#[derive(Clone)]
pub struct ItineraryAgent<S, M>
where
    S: DatasetRepository,
    M: ModelClient,
{
    store: Arc<S>,
    model: Arc<M>,
    options: PlannerOptions,
    metrics: Arc<AppMetrics>,
}

impl<S, M> ItineraryAgent<S, M>
where
    S: DatasetRepository,
    M: ModelClient,
{
    pub fn new(store: Arc<S>, model: Arc<M>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            store,
            model,
            options: PlannerOptions::default(),
            metrics,
        }
    }

    pub fn with_options(mut self, options: PlannerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    pub async fn plan_trip(&self, request: TripRequest) -> Result<PlanOutcome, AgentError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("plan_trip", %run_id, days = request.days);
        self.run(run_id, request).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, request: TripRequest) -> Result<PlanOutcome, AgentError> {
        self.metrics.inc_plan();

        let datasets = self.store.load_all()?;
        let draft = build_trip_plan(&request, &datasets, &self.options)?;
        info!(
            hotel = %draft.plan.hotel.name,
            days = draft.plan.days.len(),
            policy = self.options.hotel_policy.as_str(),
            "draft plan ready"
        );

        self.metrics.inc_model_call();
        let started = Instant::now();
        let response = self.model.complete(&draft.prompt).await;
        self.metrics.observe_model_latency(started.elapsed());

        let response = response.map_err(|err| {
            self.metrics.inc_model_failure();
            warn!(kind = err.kind(), error = %err, "model call failed");
            err
        })?;

        let formatted = format_itinerary(&response, &draft.plan);
        if let Some(warning) = &formatted.warning {
            self.metrics.inc_format_fallback();
            warn!(reason = %warning.reason, "model answer unusable, showing draft selections");
        }

        Ok(PlanOutcome {
            run_id,
            plan: draft.plan,
            itinerary: formatted.itinerary,
            warning: formatted.warning,
        })
    }

    #[instrument(skip(self))]
    pub async fn check_model(&self, timeout: Duration) -> Result<ConnectivityReport, AgentError> {
        let report = self.model.check_connectivity(timeout).await?;
        info!(status = report.status, models = report.models.len(), "model endpoint reachable");
        Ok(report)
    }
}
