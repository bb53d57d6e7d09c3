pub mod clean;
pub mod split;
pub mod imputer;
pub mod scaler;
pub mod encoder;
pub mod column_transformer;

pub use clean::*;
pub use split::*;
pub use imputer::*;
pub use scaler::*;
pub use encoder::*;
pub use column_transformer::*;
