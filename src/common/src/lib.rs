pub mod types;

pub use types::OptionalProperty;
