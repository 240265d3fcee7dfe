//! Step machine of the itinerary wizard.
//!
//! The controller never awaits anything itself. Starting a generation or a
//! save hands back a job; the caller runs it (without holding whatever lock
//! guards the controller) and feeds the outcome back in. Generation outcomes
//! carry a ticket so that only the most recent attempt is committed.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::{
    error::{GatewayError, GenerationError, WizardError},
    models::{
        itinerary::CanonicalItinerary,
        saved::SavedItinerary,
        trip_request::{TripRequest, TripRequestPatch},
    },
    services::{generation_service::GenerationOrchestrator, persistence_gateway::ItineraryGateway},
    wizard::{
        form_state::{GenerationTicket, ItineraryFormState},
        validation::{validate_preferences, validate_trip_basics, FieldErrors, Validation},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationStatus {
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "name", content = "status")]
pub enum WizardStep {
    TripBasics,
    Preferences,
    GenerationResults(GenerationStatus),
}

/// A generation the caller must run and report back through
/// [`WizardController::complete_generation`].
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub ticket: GenerationTicket,
    pub request: TripRequest,
}

impl GenerationJob {
    pub async fn run(
        &self,
        orchestrator: &GenerationOrchestrator,
    ) -> Result<CanonicalItinerary, GenerationError> {
        orchestrator.generate(&self.request).await
    }
}

#[derive(Debug, Clone)]
pub struct SaveJob {
    pub record: SavedItinerary,
    pub update_id: Option<String>,
}

impl SaveJob {
    pub async fn run(&self, gateway: &dyn ItineraryGateway) -> Result<SavedItinerary, GatewayError> {
        match &self.update_id {
            Some(id) => gateway.update_itinerary(id, &self.record).await,
            None => gateway.save_itinerary(&self.record).await,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// Validation failed; the step did not change.
    Invalid(Validation),
    Moved(WizardStep),
    Generate(GenerationJob),
    /// Already on the last step.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct WizardController {
    state: ItineraryFormState,
    step: WizardStep,
    field_errors: FieldErrors,
    last_generation: Option<GenerationStatus>,
    today: Option<NaiveDate>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self {
            state: ItineraryFormState::new(),
            step: WizardStep::TripBasics,
            field_errors: FieldErrors::new(),
            last_generation: None,
            today: None,
        }
    }

    /// Validate start dates against a fixed day instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &ItineraryFormState {
        &self.state
    }

    pub fn request(&self) -> &TripRequest {
        &self.state.request
    }

    pub fn itinerary(&self) -> Option<&CanonicalItinerary> {
        self.state.itinerary.as_ref()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn generation_status(&self) -> Option<GenerationStatus> {
        match self.step {
            WizardStep::GenerationResults(status) => Some(status),
            _ => self.last_generation,
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Apply a partial update and drop the errors of the fields it touched.
    pub fn update(&mut self, patch: TripRequestPatch) {
        for field in patch.touched_fields() {
            self.field_errors.remove(field);
        }
        self.state.update(patch);
    }

    pub fn advance(&mut self) -> AdvanceOutcome {
        match self.step {
            WizardStep::TripBasics => {
                let validation = validate_trip_basics(&self.state.request, self.today());
                self.gate(validation, WizardStep::Preferences)
            }
            WizardStep::Preferences => self.gated_generation(),
            WizardStep::GenerationResults(_) => AdvanceOutcome::Unchanged,
        }
    }

    fn gate(&mut self, validation: Validation, next: WizardStep) -> AdvanceOutcome {
        if !validation.valid {
            self.field_errors = validation.field_errors.clone();
            return AdvanceOutcome::Invalid(validation);
        }
        self.field_errors.clear();
        self.step = next;
        AdvanceOutcome::Moved(next)
    }

    /// One step back; never skips and never cancels a running generation.
    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::TripBasics => WizardStep::TripBasics,
            WizardStep::Preferences => WizardStep::TripBasics,
            WizardStep::GenerationResults(_) => WizardStep::Preferences,
        };
        self.step
    }

    /// Load a saved itinerary for editing, or start over when there is none.
    pub fn rehydrate(&mut self, editing: Option<&SavedItinerary>) {
        self.state.reset();
        self.step = WizardStep::TripBasics;
        self.field_errors.clear();
        self.last_generation = None;

        if let Some(saved) = editing {
            self.state.request = saved.to_trip_request();
            self.state.preload(saved.itinerary.clone());
            self.state.editing_id = saved.id().map(str::to_string);
        }
    }

    /// Whether `regenerate` is accepted: on the results step, or back on
    /// Preferences after a failed attempt.
    pub fn can_regenerate(&self) -> bool {
        match self.step {
            WizardStep::GenerationResults(_) => true,
            WizardStep::Preferences => self.last_generation == Some(GenerationStatus::Failed),
            WizardStep::TripBasics => false,
        }
    }

    /// Start another generation from the current request. A pending one is
    /// left running; its result will be discarded.
    pub fn regenerate(&mut self) -> Result<AdvanceOutcome, WizardError> {
        if !self.can_regenerate() {
            return Err(WizardError::RegenerateUnavailable);
        }
        Ok(self.gated_generation())
    }

    // Basics are checked again since the request may have been patched after
    // leaving that step.
    fn gated_generation(&mut self) -> AdvanceOutcome {
        let mut field_errors = validate_trip_basics(&self.state.request, self.today()).field_errors;
        field_errors.extend(validate_preferences(&self.state.request).field_errors);
        if !field_errors.is_empty() {
            self.field_errors = field_errors.clone();
            return AdvanceOutcome::Invalid(Validation {
                valid: false,
                field_errors,
            });
        }
        self.field_errors.clear();
        AdvanceOutcome::Generate(self.start_generation())
    }

    fn start_generation(&mut self) -> GenerationJob {
        let ticket = self.state.begin_generation();
        self.step = WizardStep::GenerationResults(GenerationStatus::Generating);
        GenerationJob {
            ticket,
            request: self.state.request.clone(),
        }
    }

    /// Commit the outcome of a generation job. Returns false when the job was
    /// superseded and its outcome dropped.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<CanonicalItinerary, GenerationError>,
    ) -> bool {
        if !self.state.is_current(ticket) {
            log::info!("Discarding stale generation result {:?}", ticket);
            return false;
        }

        match outcome {
            Ok(mut itinerary) => {
                if let Some(id) = &self.state.editing_id {
                    itinerary.id = Some(id.clone());
                }
                self.state.commit_itinerary(ticket, itinerary);
                self.last_generation = Some(GenerationStatus::Ready);
                if matches!(self.step, WizardStep::GenerationResults(_)) {
                    self.step = WizardStep::GenerationResults(GenerationStatus::Ready);
                }
            }
            Err(err) => {
                log::warn!("Itinerary generation failed: {}", err);
                self.state.commit_failure(ticket, err.to_string());
                self.last_generation = Some(GenerationStatus::Failed);
                if matches!(self.step, WizardStep::GenerationResults(_)) {
                    self.step = WizardStep::Preferences;
                }
            }
        }
        true
    }

    /// Walk the remaining steps, then generate and commit in one go, for
    /// callers that own the controller outright. Returns false when a step
    /// fails validation or the result was superseded.
    pub async fn generate_with(&mut self, orchestrator: &GenerationOrchestrator) -> bool {
        let job = loop {
            let outcome = if self.can_regenerate() {
                self.regenerate()
            } else {
                Ok(self.advance())
            };
            match outcome {
                Ok(AdvanceOutcome::Generate(job)) => break job,
                Ok(AdvanceOutcome::Moved(_)) => continue,
                _ => return false,
            }
        };
        let outcome = job.run(orchestrator).await;
        self.complete_generation(job.ticket, outcome)
    }

    pub fn begin_save(&mut self, owner_id: Option<&str>) -> Result<SaveJob, WizardError> {
        let itinerary = self.state.itinerary.as_ref().ok_or(WizardError::NothingToSave)?;
        if !self.state.itinerary_matches_request() {
            return Err(WizardError::StaleItinerary);
        }
        let record = SavedItinerary::from_form(&self.state.request, itinerary, owner_id);

        self.state.saving = true;
        self.state.error = None;
        Ok(SaveJob {
            record,
            update_id: self.state.editing_id.clone(),
        })
    }

    /// On success the form starts over; on failure the itinerary is kept so
    /// the save can be retried.
    pub fn finish_save(
        &mut self,
        outcome: Result<SavedItinerary, GatewayError>,
    ) -> Result<SavedItinerary, WizardError> {
        match outcome {
            Ok(saved) => {
                self.rehydrate(None);
                Ok(saved)
            }
            Err(err) => {
                log::error!("Failed to save itinerary: {}", err);
                let err = WizardError::from(err);
                self.state.saving = false;
                self.state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn save(
        &mut self,
        gateway: &dyn ItineraryGateway,
        owner_id: Option<&str>,
    ) -> Result<SavedItinerary, WizardError> {
        let job = self.begin_save(owner_id)?;
        let outcome = job.run(gateway).await;
        self.finish_save(outcome)
    }

    pub fn view(&self) -> WizardView {
        let itinerary = self.state.itinerary.as_ref();
        WizardView {
            step: self.step,
            generation_status: self.generation_status(),
            request: self.state.request.clone(),
            itinerary: itinerary.cloned(),
            per_person_cost: itinerary.map(|i| i.per_person_cost(self.state.request.group_size)),
            map_links: itinerary.map(map_links).unwrap_or_default(),
            generating: self.state.generating,
            saving: self.state.saving,
            error: self.state.error.clone(),
            field_errors: self.field_errors.clone(),
            editing_id: self.state.editing_id.clone(),
        }
    }
}

/// What the UI renders for a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: WizardStep,
    pub generation_status: Option<GenerationStatus>,
    pub request: TripRequest,
    pub itinerary: Option<CanonicalItinerary>,
    pub per_person_cost: Option<i64>,
    /// Maps search URL per activity, grouped by day.
    pub map_links: Vec<Vec<String>>,
    pub generating: bool,
    pub saving: bool,
    pub error: Option<String>,
    pub field_errors: FieldErrors,
    pub editing_id: Option<String>,
}

fn map_links(itinerary: &CanonicalItinerary) -> Vec<Vec<String>> {
    itinerary
        .day_plans
        .iter()
        .map(|day| {
            day.activities
                .iter()
                .map(|activity| activity.map_query(&itinerary.destination).maps_url())
                .collect()
        })
        .collect()
}
