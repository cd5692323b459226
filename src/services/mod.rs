pub mod answer_service;
pub mod attempt_service;
pub mod scoring_service;
pub mod selector_service;
