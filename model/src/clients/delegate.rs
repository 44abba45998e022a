use super::{normalize, Body, HttpRequest, HttpResponse, Normalized, SessionHandle};
use crate::error::Result;
use http::Method;
use log::trace;
use serde_json::Value;

/// Query parameters and body forwarded to the transport with a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestArgs {
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl RequestArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add `?action={verb}`, the way the gateway API encodes resource actions.
    pub fn action<S>(self, verb: S) -> Self
    where
        S: Into<String>,
    {
        self.query("action", verb)
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn raw_body<D, S>(mut self, data: D, content_type: S) -> Self
    where
        D: Into<Vec<u8>>,
        S: Into<String>,
    {
        self.body = Body::Raw {
            data: data.into(),
            content_type: content_type.into(),
        };
        self
    }
}

/// The request verbs every manager is built on. Implementors only provide `kind` and `session`;
/// everything else has a default implementation.
///
/// Each verb has a normalized form, returning `(status, payload)` as a `Normalized`, and a `_raw`
/// form that returns the transport's response untouched. Neither form treats an HTTP error status
/// as an `Err`.
pub trait RequestDelegate {
    /// The kind of resource this delegate works on, used in errors and logs.
    fn kind(&self) -> &'static str;

    fn session(&self) -> &SessionHandle;

    fn delegate_raw(&self, method: Method, path: &str, args: RequestArgs) -> Result<HttpResponse> {
        let session = self.session().upgrade()?;
        let request = HttpRequest {
            method,
            url: session.url(path)?,
            query: args.query,
            body: args.body,
        };
        trace!("{} {} ({})", request.method, request.url, self.kind());
        session.send(&request)
    }

    fn delegate(&self, method: Method, path: &str, args: RequestArgs) -> Result<Normalized> {
        Ok(normalize(self.delegate_raw(method, path, args)?))
    }

    fn get(&self, path: &str, args: RequestArgs) -> Result<Normalized> {
        self.delegate(Method::GET, path, args)
    }

    fn get_raw(&self, path: &str, args: RequestArgs) -> Result<HttpResponse> {
        self.delegate_raw(Method::GET, path, args)
    }

    fn create(&self, path: &str, args: RequestArgs) -> Result<Normalized> {
        self.delegate(Method::POST, path, args)
    }

    /// PUT `data` as a JSON body.
    fn update(&self, path: &str, data: &Value, args: RequestArgs) -> Result<Normalized> {
        self.delegate(Method::PUT, path, args.json(data.clone()))
    }

    /// PUT `data` as an opaque body with the given content type, e.g. a YAML manifest.
    fn update_as(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        args: RequestArgs,
    ) -> Result<Normalized> {
        self.delegate(Method::PUT, path, args.raw_body(data, content_type))
    }

    fn delete(&self, path: &str, args: RequestArgs) -> Result<Normalized> {
        self.delegate(Method::DELETE, path, args)
    }

    fn patch(&self, path: &str, args: RequestArgs) -> Result<Normalized> {
        self.delegate(Method::PATCH, path, args)
    }
}

/// A `RequestDelegate` for one kind of resource. Managers hold one of these rather than
/// implementing the trait themselves, which keeps the verbs apart from the managers' own
/// `get`/`create`/`update`/`delete` functions.
#[derive(Debug, Clone)]
pub struct Delegate {
    kind: &'static str,
    session: SessionHandle,
}

impl Delegate {
    pub fn new(kind: &'static str, session: SessionHandle) -> Self {
        Self { kind, session }
    }
}

impl RequestDelegate for Delegate {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }
}
