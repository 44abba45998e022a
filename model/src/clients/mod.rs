/*!

The request layer every manager is built on: a `Transport` that sends requests, a `Session` shared
by the managers of one client, and the `RequestDelegate` verbs that turn every response into a
`(status, payload)` pair.

!*/

mod delegate;
mod http_status_code;
mod response;
mod session;
mod transport;

pub use delegate::{Delegate, RequestArgs, RequestDelegate};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use response::{normalize, HttpResponse, Normalized, Payload};
pub use session::{Session, SessionHandle};
pub use transport::{Body, HttpRequest, ReqwestTransport, Transport};
