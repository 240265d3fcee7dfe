use serde::Serialize;

use crate::models::{
    itinerary::CanonicalItinerary,
    trip_request::{TripRequest, TripRequestPatch},
};

/// Identity of one generation attempt. Only the result of the latest ticket
/// is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GenerationTicket(u64);

/// The in-progress request of one wizard session and the last generated
/// result.
#[derive(Debug, Clone, Default)]
pub struct ItineraryFormState {
    pub request: TripRequest,
    pub itinerary: Option<CanonicalItinerary>,
    pub generating: bool,
    pub saving: bool,
    pub error: Option<String>,
    pub editing_id: Option<String>,
    latest_ticket: u64,
    pending_request: Option<TripRequest>,
    // Request the stored itinerary was generated from.
    generated_from: Option<TripRequest>,
}

impl ItineraryFormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to a fresh request. Any generation still in flight becomes stale.
    pub fn reset(&mut self) {
        let latest_ticket = self.latest_ticket + 1;
        *self = Self {
            latest_ticket,
            ..Self::default()
        };
    }

    pub fn update(&mut self, patch: TripRequestPatch) {
        self.request.apply(patch);
    }

    /// Start a new attempt from the current request. The previous itinerary
    /// is dropped so it can never be saved against the new request.
    pub fn begin_generation(&mut self) -> GenerationTicket {
        self.latest_ticket += 1;
        self.generating = true;
        self.error = None;
        self.itinerary = None;
        self.generated_from = None;
        self.pending_request = Some(self.request.clone());
        GenerationTicket(self.latest_ticket)
    }

    /// Load an itinerary that belongs to the current request, such as a saved
    /// record opened for editing.
    pub fn preload(&mut self, itinerary: CanonicalItinerary) {
        self.itinerary = Some(itinerary);
        self.generated_from = Some(self.request.clone());
    }

    /// Whether the stored itinerary still describes the trip in the form.
    pub fn itinerary_matches_request(&self) -> bool {
        match (&self.itinerary, &self.generated_from) {
            (Some(_), Some(from)) => from.same_trip(&self.request),
            _ => false,
        }
    }

    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        ticket.0 == self.latest_ticket
    }

    /// Store a generated itinerary. Returns false and changes nothing when a
    /// newer attempt has started since `ticket` was issued.
    pub fn commit_itinerary(&mut self, ticket: GenerationTicket, itinerary: CanonicalItinerary) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.itinerary = Some(itinerary);
        self.generated_from = self.pending_request.take();
        self.generating = false;
        self.error = None;
        true
    }

    pub fn commit_failure(&mut self, ticket: GenerationTicket, message: String) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.pending_request = None;
        self.generating = false;
        self.error = Some(message);
        true
    }
}
