pub mod activator;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod interpret;
pub mod layer;
pub mod network;
pub mod preprocess;
pub mod trainer;

mod utils;

pub use error::{Error, Result};
pub use network::Network;
