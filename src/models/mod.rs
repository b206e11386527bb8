pub mod engagement;
pub mod enums;
pub mod insight;
pub mod queue;
pub mod report;

pub use engagement::*;
pub use enums::*;
pub use insight::*;
pub use queue::*;
pub use report::*;
