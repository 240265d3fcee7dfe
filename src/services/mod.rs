pub mod backend_client;
pub mod generation_service;
pub mod normalizer;
pub mod persistence_gateway;
