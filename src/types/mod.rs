pub mod ids;
pub mod index;
pub mod percent;
pub mod price;
pub mod series;
pub mod snapshot;
