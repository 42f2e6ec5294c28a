pub mod error;

pub use error::{FatError, FatResult};
