pub mod connectors;
pub mod processor;

pub use processor::QuoteProcessor;
