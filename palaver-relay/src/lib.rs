pub mod relay;

pub use relay::{RelayState, router};
