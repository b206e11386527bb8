pub mod insights;
pub mod queue;
