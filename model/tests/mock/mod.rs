/*!

A [`Transport`] that answers from a script instead of the network, so managers can be tested
without a cluster. Every request is recorded for inspection.

!*/

use harvester_model::clients::HttpRequest;
use harvester_model::{ClusterVersion, HarvesterClient, HttpResponse, Transport};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub(crate) const ENDPOINT: &str = "https://harvester.test/";

#[derive(Default)]
struct Script {
    responses: VecDeque<HttpResponse>,
    requests: Vec<HttpRequest>,
}

/// Cloning shares the script, so a test can keep a handle after giving the transport away.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    script: Rc<RefCell<Script>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a response with an arbitrary content type and body.
    pub(crate) fn respond<B>(&self, status: u16, content_type: Option<&str>, body: B) -> &Self
    where
        B: Into<Vec<u8>>,
    {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        }
        let response =
            HttpResponse::new(StatusCode::from_u16(status).unwrap(), headers, body.into());
        self.script.borrow_mut().responses.push_back(response);
        self
    }

    pub(crate) fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(status, Some("application/json"), body.to_string())
    }

    /// Every request sent so far.
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.script.borrow().requests.clone()
    }

    /// A client for a cluster at `version` that sends through this transport.
    pub(crate) fn client(&self, version: &str) -> HarvesterClient {
        HarvesterClient::with_transport(
            Box::new(self.clone()),
            ENDPOINT.parse().unwrap(),
            "default",
            ClusterVersion::parse(version).unwrap(),
        )
        .unwrap()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> harvester_model::Result<HttpResponse> {
        let mut script = self.script.borrow_mut();
        script.requests.push(request.clone());
        match script.responses.pop_front() {
            Some(response) => Ok(response),
            None => panic!("no response scripted for {} {}", request.method, request.url),
        }
    }
}

/// The path of a request's URL, without the leading slash.
pub(crate) fn path_of(request: &HttpRequest) -> &str {
    request.url.path().trim_start_matches('/')
}
