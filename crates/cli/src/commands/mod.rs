pub mod project;
pub mod runners;
pub mod script;
pub mod series;
pub mod util;

pub use project::*;
pub use runners::*;
pub use script::*;
pub use series::*;
pub use util::*;
