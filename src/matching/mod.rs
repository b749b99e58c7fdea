pub mod engine;
pub mod normalize;
pub mod similarity;
pub mod stats;
pub mod weights;
