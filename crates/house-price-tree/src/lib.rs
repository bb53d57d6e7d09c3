pub mod binning;
pub mod decision_tree;
pub mod random_forest;
pub mod gradient_boosting;

pub use decision_tree::*;
pub use random_forest::*;
pub use gradient_boosting::*;
