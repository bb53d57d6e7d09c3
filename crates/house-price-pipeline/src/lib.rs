//! Batch runs of the house price pipeline: acquire and prepare the data,
//! train the model roster, pick the best candidate and persist artifacts.

pub mod artifacts;
pub mod settings;
pub mod error;
pub mod estimator;
pub mod roster;
pub mod runs;
pub mod trainer;

pub use artifacts::*;
pub use settings::{ProjectPaths, Settings};
pub use error::{PipelineError, PipelineResult};
pub use estimator::{Regressor, TrainedModel};
pub use roster::{default_roster, RosterEntry};
pub use runs::*;
pub use trainer::{select_best, train_and_evaluate, Candidate};
