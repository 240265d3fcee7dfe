pub mod itinerary;
pub mod saved;
pub mod trip_request;
