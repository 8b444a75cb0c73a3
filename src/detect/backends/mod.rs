pub mod nvision;
pub mod stub;

pub use nvision::{NvisionBackend, NvisionConfig, DEFAULT_ENDPOINT};
pub use stub::StubBackend;
