//! In-process Kubernetes API mock for integration tests
//!
//! Every request is recorded. POSTs echo the submitted object with 201,
//! DELETEs answer with a success Status, GETs return registered objects or
//! 404. Individual requests can be made to fail with a given status code.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use function_checker::K8sClient;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use kube::client::Body;
use serde_json::{json, Value};

/// One recorded API request
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl Call {
    pub fn is(&self, method: Method, path_suffix: &str) -> bool {
        self.method == method && self.path.ends_with(path_suffix)
    }
}

type Hook = Arc<dyn Fn(&Call) + Send + Sync>;

/// Mock behaviour
#[derive(Clone, Default)]
pub struct MockConfig {
    failures: Vec<(Method, String, u16)>,
    objects: Vec<(String, Value)>,
    hook: Option<Hook>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` requests whose path ends with `path_suffix` with an
    /// API error of the given code
    pub fn fail(mut self, method: Method, path_suffix: &str, code: u16) -> Self {
        self.failures.push((method, path_suffix.to_string(), code));
        self
    }

    /// Serve `object` for GET requests to `path`
    pub fn object(mut self, path: &str, object: Value) -> Self {
        self.objects.push((path.to_string(), object));
        self
    }

    /// Run `hook` for every request before it is answered
    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Call) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    fn respond(&self, call: &Call, body: &[u8]) -> (StatusCode, Value) {
        if let Some((_, _, code)) = self
            .failures
            .iter()
            .find(|(method, suffix, _)| call.is(method.clone(), suffix))
        {
            return (
                StatusCode::from_u16(*code).unwrap(),
                error_status(*code),
            );
        }

        match call.method {
            Method::POST => (
                StatusCode::CREATED,
                serde_json::from_slice(body).unwrap_or_else(|_| json!({})),
            ),
            Method::DELETE => (StatusCode::OK, success_status()),
            Method::GET => match self.objects.iter().find(|(path, _)| *path == call.path) {
                Some((_, object)) => (StatusCode::OK, object.clone()),
                None => (StatusCode::NOT_FOUND, error_status(404)),
            },
            _ => (StatusCode::METHOD_NOT_ALLOWED, error_status(405)),
        }
    }
}

fn success_status() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Status",
        "metadata": {},
        "status": "Success"
    })
}

fn error_status(code: u16) -> Value {
    let reason = match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        _ => "InternalError",
    };
    json!({
        "apiVersion": "v1",
        "kind": "Status",
        "metadata": {},
        "status": "Failure",
        "message": format!("mock {}", reason),
        "reason": reason,
        "code": code
    })
}

/// Handle to a running mock API server
pub struct ApiMock {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ApiMock {
    /// Start the mock and return a client talking to it
    pub fn start(config: MockConfig) -> (K8sClient, ApiMock) {
        let (service, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        tokio::spawn(async move {
            while let Some((request, send)) = handle.next_request().await {
                let call = Call {
                    method: request.method().clone(),
                    path: request.uri().path().to_string(),
                    query: request.uri().query().map(String::from),
                };
                let body = request
                    .into_body()
                    .collect()
                    .await
                    .map(|collected| collected.to_bytes())
                    .unwrap_or_default();

                recorded.lock().unwrap().push(call.clone());
                if let Some(hook) = &config.hook {
                    hook(&call);
                }

                let (status, payload) = config.respond(&call, &body);
                let response = Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                    .unwrap();
                send.send_response(response);
            }
        });

        let client = K8sClient::from_client(kube::Client::new(service, "default"), "mock");
        (client, ApiMock { calls })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Paths of every request with the given method, in order
    pub fn paths(&self, method: Method) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .map(|c| c.path)
            .collect()
    }

    pub fn count(&self, method: Method) -> usize {
        self.paths(method).len()
    }
}

/// Resource path helpers for the default namespace and name prefix
pub mod paths {
    pub const CONFIGMAPS: &str = "/api/v1/namespaces/default/configmaps";
    pub const SERVICES: &str = "/api/v1/namespaces/default/services";
    pub const STATEFULSETS: &str = "/apis/apps/v1/namespaces/default/statefulsets";
    pub const INGRESSES: &str = "/apis/networking.k8s.io/v1/namespaces/default/ingresses";
    pub const PVCS: &str = "/api/v1/namespaces/default/persistentvolumeclaims";

    pub fn named(collection: &str, name: &str) -> String {
        format!("{}/{}", collection, name)
    }
}
