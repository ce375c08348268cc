pub mod classifier;
pub mod jobs;
pub mod scanner;
