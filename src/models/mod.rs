// Re-export all model types for ease of use

pub mod resource;
pub mod results;
pub mod diagnostics;

pub use resource::*;
pub use results::*;
pub use diagnostics::*;
