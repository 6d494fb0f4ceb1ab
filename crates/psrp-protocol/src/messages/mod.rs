pub mod connect_runspacepool;
pub mod create_pipeline;
pub mod encrypted_session_key;
pub mod error_record;
pub mod information_record;
pub mod init_runspace_pool;
pub mod pipeline_host_call;
pub mod pipeline_host_response;
pub mod pipeline_input;
pub mod pipeline_output;
pub mod pipeline_state;
pub mod progress_record;
pub mod public_key;
pub mod public_key_request;
pub mod runspace_pool_host_call;
pub mod runspace_pool_host_response;
pub mod runspace_pool_state;
pub mod session_capability;

pub use connect_runspacepool::*;
pub use create_pipeline::*;
pub use encrypted_session_key::*;
pub use error_record::*;
pub use information_record::*;
pub use init_runspace_pool::*;
pub use pipeline_host_call::*;
pub use pipeline_host_response::*;
pub use pipeline_input::*;
pub use pipeline_output::*;
pub use pipeline_state::*;
pub use progress_record::*;
pub use public_key::*;
pub use public_key_request::*;
pub use runspace_pool_host_call::*;
pub use runspace_pool_host_response::*;
pub use runspace_pool_state::*;
pub use session_capability::*;

// Re-export ps_value types for backwards compatibility
pub use crate::ps_value::{
    ComplexObject, ComplexObjectContent, Container, PsEnums, PsPrimitiveValue, PsProperty, PsType,
    PsValue, deserialize,
};
