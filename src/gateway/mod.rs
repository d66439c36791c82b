// Keywarden — Gateway Module
//
// The boundary between the untrusted host and the enclave: the request/reply
// protocol, the origin-checking router, and the Unix socket transport that
// identifies callers by their executable.

mod caller;
mod protocol;
mod router;
mod uds;

pub use caller::CallerInfo;
pub use protocol::{Base64Bytes, ErrorBody, InboundMessage, Request, Response, REQUEST_NAMES};
pub use router::{Router, RouterConfig, DEFAULT_IGNORED_TARGETS};
pub use uds::{UdsServer, UNKNOWN_ORIGIN};
