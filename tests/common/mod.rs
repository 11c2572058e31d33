//! Common test utilities for pipeline integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use btget::helpers::acquire::{
    DownloadRequest, Downloaded, Transport, TransportError, write_artifact,
};
use btget::transparency::{LogRegistry, LogSource, RegistryLoadError};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

/// In-memory [`Transport`] serving canned responses.
///
/// Downloads go through the real artifact writer so staging behaviour
/// matches the HTTP transport.
#[derive(Default)]
pub struct FakeTransport {
    responses: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            url.to_string(),
            Canned {
                status: 200,
                body: body.into(),
                headers: Vec::new(),
            },
        );
        self
    }

    pub fn serve_with_header(
        mut self,
        url: &str,
        body: impl Into<Vec<u8>>,
        name: &str,
        value: &str,
    ) -> Self {
        self.responses.insert(
            url.to_string(),
            Canned {
                status: 200,
                body: body.into(),
                headers: vec![(name.to_ascii_lowercase(), value.to_string())],
            },
        );
        self
    }

    pub fn fail(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(
            url.to_string(),
            Canned {
                status,
                body: Vec::new(),
                headers: Vec::new(),
            },
        );
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, url: &str) -> Result<Option<&Canned>, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            None => Ok(None),
            Some(c) if c.status == 404 => Ok(None),
            Some(c) if c.status >= 400 => Err(TransportError::Status {
                url: url.to_string(),
                status: c.status,
            }),
            Some(c) => Ok(Some(c)),
        }
    }
}

impl Transport for FakeTransport {
    fn download(&self, request: &DownloadRequest<'_>) -> Result<Downloaded, TransportError> {
        let canned = self
            .respond(request.url)?
            .ok_or_else(|| TransportError::Status {
                url: request.url.to_string(),
                status: 404,
            })?;

        write_artifact(
            Cursor::new(&canned.body),
            Some(canned.body.len() as u64),
            canned.headers.clone(),
            request,
        )
    }

    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.respond(url)?.map(|c| c.body.clone()))
    }
}

/// Log list held in memory.
pub struct StaticLogSource(pub Vec<u8>);

impl LogSource for StaticLogSource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn read(&self, _transport: &dyn Transport) -> Result<Vec<u8>, RegistryLoadError> {
        Ok(self.0.clone())
    }
}

/// Registry containing exactly `logs`.
pub fn registry_of(logs: &[&TestLog]) -> LogRegistry {
    LogRegistry::parse(&log_list_json(logs)).unwrap()
}
