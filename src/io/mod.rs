pub mod export;

pub use export::{Exporter, UserSnapshot};
