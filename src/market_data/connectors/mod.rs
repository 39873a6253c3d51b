pub mod yahoo;

pub use yahoo::YahooConnector;
