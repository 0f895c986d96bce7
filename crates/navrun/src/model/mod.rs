pub mod config;
pub mod ids;
pub mod outcome;
pub mod settings;
pub mod spec;

pub use config::*;
pub use ids::RunId;
pub use outcome::*;
pub use settings::*;
pub use spec::*;
