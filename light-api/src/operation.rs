//! Typed device operations
//!
//! Each operation knows its HTTP method, path, request body and how to read
//! the reply, so transports only move strings.

use serde_json::Value;

use crate::error::{DeviceError, Result};
use crate::wire::{DeviceInfo, ProbeInfo, StateCommand};

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully built request, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub method: Method,
    pub path: &'static str,
    pub body: Option<String>,
}

/// Base trait for all device operations
pub trait DeviceOperation {
    /// Decoded reply
    type Response;

    const METHOD: Method;

    const PATH: &'static str;

    /// JSON body to send, if any
    fn body(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn parse_response(body: &str) -> Result<Self::Response>;

    fn request(&self) -> Result<DeviceRequest> {
        Ok(DeviceRequest {
            method: Self::METHOD,
            path: Self::PATH,
            body: self.body()?,
        })
    }
}

/// `POST /json/state` with a state command
#[derive(Debug, Clone)]
pub struct SetState(pub StateCommand);

impl DeviceOperation for SetState {
    type Response = ();
    const METHOD: Method = Method::Post;
    const PATH: &'static str = "/json/state";

    fn body(&self) -> Result<Option<String>> {
        serde_json::to_string(&self.0)
            .map(Some)
            .map_err(|e| DeviceError::Parse(e.to_string()))
    }

    fn parse_response(_body: &str) -> Result<()> {
        Ok(())
    }
}

/// `POST /json/state` replaying a captured body verbatim
#[derive(Debug, Clone)]
pub struct RestoreState(pub String);

impl DeviceOperation for RestoreState {
    type Response = ();
    const METHOD: Method = Method::Post;
    const PATH: &'static str = "/json/state";

    fn body(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }

    fn parse_response(_body: &str) -> Result<()> {
        Ok(())
    }
}

/// `GET /json/state`, returning the raw body
///
/// The body is checked to be a JSON object but otherwise kept byte for byte.
#[derive(Debug, Clone, Copy)]
pub struct GetState;

impl DeviceOperation for GetState {
    type Response = String;
    const METHOD: Method = Method::Get;
    const PATH: &'static str = "/json/state";

    fn parse_response(body: &str) -> Result<String> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(_)) => Ok(body.to_string()),
            Ok(_) => Err(DeviceError::Parse("state is not a JSON object".to_string())),
            Err(e) => Err(DeviceError::Parse(e.to_string())),
        }
    }
}

/// `GET /json`: state, info and the effect list in one reply
#[derive(Debug, Clone, Copy)]
pub struct GetDeviceInfo;

impl DeviceOperation for GetDeviceInfo {
    type Response = DeviceInfo;
    const METHOD: Method = Method::Get;
    const PATH: &'static str = "/json";

    fn parse_response(body: &str) -> Result<DeviceInfo> {
        serde_json::from_str(body).map_err(|e| DeviceError::Parse(e.to_string()))
    }
}

/// `GET /json/info`, the lightweight reachability probe
#[derive(Debug, Clone, Copy)]
pub struct Probe;

impl DeviceOperation for Probe {
    type Response = ProbeInfo;
    const METHOD: Method = Method::Get;
    const PATH: &'static str = "/json/info";

    fn parse_response(body: &str) -> Result<ProbeInfo> {
        serde_json::from_str(body).map_err(|e| DeviceError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::wire::Segment;

    #[test]
    fn test_set_state_request() {
        let op = SetState(StateCommand {
            on: true,
            bri: 10,
            seg: Segment::solid(Rgb::new(1, 2, 3)),
            transition: None,
        });
        let request = op.request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/json/state");
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"on":true,"bri":10,"seg":{"col":[[1,2,3]],"fx":0,"sx":128,"ix":128}}"#)
        );
    }

    #[test]
    fn test_get_state_keeps_raw_body() {
        let raw = "{\"on\":true,  \"bri\":42,\"seg\":[{\"id\":0}]}";
        assert_eq!(GetState::parse_response(raw).unwrap(), raw);
        assert!(GetState::parse_response("[1,2]").is_err());
        assert!(GetState::parse_response("<html>").is_err());
    }

    #[test]
    fn test_restore_body_is_verbatim() {
        let raw = "{\"bri\": 1}".to_string();
        let request = RestoreState(raw.clone()).request().unwrap();
        assert_eq!(request.body, Some(raw));
        assert_eq!(GetState.request().unwrap().body, None);
    }
}
