pub mod events;
pub mod random;
pub mod sensor;
pub mod session;

pub use events::*;
pub use random::*;
pub use sensor::*;
pub use session::*;
