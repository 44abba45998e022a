use super::{HttpRequest, HttpResponse, Transport};
use crate::error::{self, Result};
use crate::ClusterVersion;
use snafu::{OptionExt, ResultExt};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use url::Url;

/// State shared by every manager of one client: the transport, where the cluster lives, and what
/// version it runs. Owned by `HarvesterClient`; managers only ever see a `SessionHandle`.
pub struct Session {
    transport: Box<dyn Transport>,
    endpoint: Url,
    namespace: String,
    version: RefCell<ClusterVersion>,
}

impl Session {
    pub fn new<S>(
        transport: Box<dyn Transport>,
        mut endpoint: Url,
        namespace: S,
        version: ClusterVersion,
    ) -> Self
    where
        S: Into<String>,
    {
        // Without the trailing slash `Url::join` would replace the last path segment.
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Self {
            transport,
            endpoint,
            namespace: namespace.into(),
            version: RefCell::new(version),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The namespace used when an operation is not given one.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn cluster_version(&self) -> ClusterVersion {
        self.version.borrow().clone()
    }

    pub(crate) fn set_cluster_version(&self, version: ClusterVersion) {
        *self.version.borrow_mut() = version;
    }

    /// Resolve an API path against the endpoint.
    pub fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.endpoint.join(path).context(error::UrlJoinSnafu {
            endpoint: self.endpoint.as_str(),
            path,
        })
    }

    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request)
    }
}

/// A manager's non-owning reference to its client's `Session`.
#[derive(Debug, Clone)]
pub struct SessionHandle(Weak<Session>);

impl SessionHandle {
    pub fn new(session: &Rc<Session>) -> Self {
        Self(Rc::downgrade(session))
    }

    /// A handle that was never attached to a session. Every operation through it fails with
    /// `Error::ClientGone`.
    pub fn detached() -> Self {
        Self(Weak::new())
    }

    /// Get the session, or `Error::ClientGone` if the client has been dropped.
    pub fn upgrade(&self) -> Result<Rc<Session>> {
        self.0.upgrade().context(error::ClientGoneSnafu)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
