pub mod credentials;
pub mod probe;
pub mod recovery;
pub mod state;

pub use credentials::*;
pub use probe::*;
pub use recovery::*;
pub use state::*;
