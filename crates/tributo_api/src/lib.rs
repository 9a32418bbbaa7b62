//! Request-facing API over `tributo_core`.
//! Each call opens its own connection and returns a serializable envelope.

mod api;
mod error;

pub use api::{
    Api, DeleteResponse, HealthResponse, RootResponse, SectorsResponse, WriteResponse,
};
pub use error::{ApiError, ApiResult, ErrorKind};
