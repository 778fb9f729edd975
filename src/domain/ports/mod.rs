//! Port definitions.

mod fetch_port;
mod transform_port;
mod url_port;

pub use fetch_port::SourceFetchPort;
pub use transform_port::{OptimizerPort, TransformationPort};
pub use url_port::UrlStrategy;

#[cfg(test)]
pub mod mocks {
    pub use super::fetch_port::mock::MockSourceFetcher;
}
