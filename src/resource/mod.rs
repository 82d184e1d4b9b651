mod registry;

pub mod assembler;
pub mod dispatch;
pub mod error;
pub mod normalizer;
pub mod paginator;
pub mod params;
pub mod path_extractor;
pub mod protocol;
pub mod transport;

pub use dispatch::{DispatchOptions, Dispatcher};
pub use error::{DispatchError, ItemError};
pub use normalizer::{OutputRecord, DEFAULT_ENVELOPE_KEY};
pub use paginator::DEFAULT_PAGE_SIZE;
pub use params::{JsonItems, ParameterSource};
pub use protocol::{HttpMethod, OperationSchema, PaginationMode, RequestDescriptor};
pub use registry::{CatalogError, OperationCatalog};
pub use transport::{Transport, TransportError};
