pub mod ollama;
pub mod prompt;
pub mod ranker;
pub mod refiner;
pub mod response;
