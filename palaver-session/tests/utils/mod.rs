pub mod mock_backend;

pub use helpers::*;
pub use mock_backend::*;
