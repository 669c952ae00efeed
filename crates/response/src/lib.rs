mod classify;
mod completion;
mod context;
mod error;
mod handler;
mod handoff;
mod identity;
mod json;
mod mapping;
mod outcome;
mod protocol;
mod store;

pub use classify::{Classification, Classifier};
pub use completion::CompletionResult;
pub use context::{BlockingPool, ExecutionContext, Job, SerialQueue};
pub use error::{
    DecodeError, ErrorKind, MappingError, ResponseError, StoreError, TransportError,
};
pub use handler::{ResponseHandler, ResponseHandlerConfig};
pub use handoff::{Handoff, Identities, Refetch, Shape, Share};
pub use identity::{KeyValue, ThreadConfined};
pub use json::{JsonDecoder, JsonValue, Payload};
pub use mapping::{DomainResult, Mapping, StoreMapping, ValueMapping};
pub use outcome::{RawOutcome, ResponseMetadata};
pub use protocol::{GraphQLError, PathSegment, ProtocolError, SourceLocation};
pub use store::{Adaptor, FetchMode};
