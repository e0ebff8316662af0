//! Access to the Astarte AppEngine and Realm Management APIs.
//!
//! [`AstarteApi`] is the seam the dashboard pages build on: it fetches the
//! raw device data and the definitions needed to interpret it, and
//! [`AstarteApi::get_device_data_tree`] combines them into a [`DataTree`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = AstarteClient::new(config.api_urls()?, session);
//! let request = DeviceDataRequest::new(device_id, "org.astarte-platform.genericsensors.Values")
//!     .path("/light/value")
//!     .limit(100);
//!
//! let tree = client.get_device_data_tree(&request).await?;
//! for record in tree.to_linearized_data() {
//!     // ...
//! }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ApiUrls;
use crate::data_tree::DataTree;
use crate::datetime::format_timestamp;
use crate::session::Session;

use super::endpoint;
use super::error::ClientError;
use super::types::{DeviceDetails, InterfaceDescriptor, InterfaceType};
use super::value::AstarteValue;

/// A device data query. Filters are forwarded to AppEngine as is: `since`
/// and `to` are inclusive, `since_after` is exclusive and `limit` keeps the
/// most recent samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDataRequest {
    pub device_id: String,
    pub interface_name: String,
    pub path: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub since_after: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub keep_milliseconds: Option<bool>,
}

impl DeviceDataRequest {
    pub fn new(device_id: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            interface_name: interface_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    #[must_use]
    pub fn since_after(mut self, since_after: DateTime<Utc>) -> Self {
        self.since_after = Some(since_after);
        self
    }

    #[must_use]
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn keep_milliseconds(mut self, keep_milliseconds: bool) -> Self {
        self.keep_milliseconds = Some(keep_milliseconds);
        self
    }

    /// The requested path, normalized to `/a/b` (`""` for the whole
    /// interface).
    pub fn endpoint(&self) -> String {
        endpoint::segments(self.path.as_deref().unwrap_or_default())
            .iter()
            .fold(String::new(), |path, segment| endpoint::join(&path, segment))
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(since) = self.since {
            query.push(("since", format_timestamp(since)));
        }
        if let Some(since_after) = self.since_after {
            query.push(("since_after", format_timestamp(since_after)));
        }
        if let Some(to) = self.to {
            query.push(("to", format_timestamp(to)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(keep_milliseconds) = self.keep_milliseconds {
            query.push(("keep_milliseconds", keep_milliseconds.to_string()));
        }

        query
    }
}

#[allow(async_fn_in_trait)]
pub trait AstarteApi {
    async fn get_device_introspection(&self, device_id: &str)
        -> Result<DeviceDetails, ClientError>;

    async fn get_interface(
        &self,
        interface_name: &str,
        interface_major: u32,
    ) -> Result<InterfaceDescriptor, ClientError>;

    /// The raw AppEngine payload for the request.
    async fn get_device_data(&self, request: &DeviceDataRequest) -> Result<Value, ClientError>;

    /// Fetches the data of an interface as installed on the device and
    /// builds its tree.
    async fn get_device_data_tree(
        &self,
        request: &DeviceDataRequest,
    ) -> Result<DataTree, ClientError> {
        let device = self.get_device_introspection(&request.device_id).await?;

        let interface_major = device
            .installed_major(&request.interface_name)
            .ok_or_else(|| ClientError::InterfaceNotInIntrospection {
                device_id: request.device_id.clone(),
                interface_name: request.interface_name.clone(),
            })?;

        let interface = self
            .get_interface(&request.interface_name, interface_major)
            .await?;
        let data = self.get_device_data(request).await?;

        let tree = DataTree::from_device_data(&interface, &data, &request.endpoint());
        debug!(
            device_id = %request.device_id,
            interface_name = %request.interface_name,
            kind = ?tree.kind,
            samples = tree.sample_count(),
            "device data tree built"
        );

        Ok(tree)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for a realm, authenticated with the session token.
#[derive(Debug, Clone)]
pub struct AstarteClient {
    client: Client,
    urls: ApiUrls,
    session: Session,
}

impl AstarteClient {
    pub fn new(urls: ApiUrls, session: Session) -> Self {
        Self {
            client: Client::new(),
            urls,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn appengine_url(&self, path: &str) -> String {
        format!("{}/v1/{}{path}", self.urls.appengine, self.session.realm())
    }

    fn realm_management_url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}{path}",
            self.urls.realm_management,
            self.session.realm()
        )
    }

    fn device_data_url(&self, device_id: &str, interface_name: &str, path: &str) -> String {
        self.appengine_url(&format!(
            "/devices/{device_id}/interfaces/{interface_name}{path}"
        ))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ClientError> {
        debug!(url, ?query, "GET");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.session.token())
            .query(query)
            .send()
            .await?;

        let envelope: Envelope<T> = check_status(url, response)
            .await?
            .json()
            .await
            .map_err(|err| ClientError::Parse(err.to_string()))?;

        Ok(envelope.data)
    }

    pub async fn list_interface_names(&self) -> Result<Vec<String>, ClientError> {
        self.get(&self.realm_management_url("/interfaces"), &[])
            .await
    }

    /// Publishes `value` on a server owned interface. `endpoint` is a
    /// mapping endpoint whose parametric segments are filled from
    /// `parameters`.
    pub async fn send_data_to_device(
        &self,
        device_id: &str,
        interface: &InterfaceDescriptor,
        endpoint: &str,
        parameters: &HashMap<String, String>,
        value: &AstarteValue,
    ) -> Result<(), ClientError> {
        let path = endpoint::substitute(endpoint, parameters)?;
        let url = self.device_data_url(device_id, &interface.interface_name, &path);

        let method = match interface.interface_type {
            InterfaceType::Properties => Method::PUT,
            InterfaceType::Datastream => Method::POST,
        };
        debug!(%url, %method, "sending data to device");

        let response = self
            .client
            .request(method, &url)
            .bearer_auth(self.session.token())
            .json(&data_body(value))
            .send()
            .await?;

        check_status(&url, response).await?;
        Ok(())
    }
}

impl AstarteApi for AstarteClient {
    async fn get_device_introspection(
        &self,
        device_id: &str,
    ) -> Result<DeviceDetails, ClientError> {
        self.get(&self.appengine_url(&format!("/devices/{device_id}")), &[])
            .await
    }

    async fn get_interface(
        &self,
        interface_name: &str,
        interface_major: u32,
    ) -> Result<InterfaceDescriptor, ClientError> {
        let url =
            self.realm_management_url(&format!("/interfaces/{interface_name}/{interface_major}"));
        self.get(&url, &[]).await
    }

    async fn get_device_data(&self, request: &DeviceDataRequest) -> Result<Value, ClientError> {
        let url = self.device_data_url(
            &request.device_id,
            &request.interface_name,
            &request.endpoint(),
        );
        self.get(&url, &request.query()).await
    }
}

async fn check_status(url: &str, response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status.as_u16(), url, &body))
}

/// Wraps a value the way AppEngine expects it in request bodies.
pub fn data_body(value: &AstarteValue) -> Value {
    json!({ "data": value.to_json() })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::astarte::mock::MockApi;
    use crate::data_tree::{DataKind, LinearizedRecord};

    const DEVICE_ID: &str = "f0VMRgIBAQAAAAAAAAAAAA";
    const INTERFACE: &str = "test.astarte.IndividualObjectInterface";

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 10, 14, 12, 27, 2).unwrap()
    }

    fn t2() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 10, 14, 12, 27, 13).unwrap()
    }

    fn mock_api() -> MockApi {
        MockApi::new()
            .with_interface(json!({
                "interface_name": INTERFACE,
                "version_major": 0,
                "version_minor": 1,
                "type": "datastream",
                "ownership": "device",
                "mappings": [{ "endpoint": "/%{sensor_id}/light/estimated", "type": "double" }]
            }))
            .with_device(DEVICE_ID, &[(INTERFACE, 0, 1)])
            .with_data(
                DEVICE_ID,
                INTERFACE,
                json!({
                    "sensors": {
                        "light": {
                            "estimated": [
                                { "timestamp": "2020-10-14T12:27:02.331Z", "value": 81 },
                                { "timestamp": "2020-10-14T12:27:13.200Z", "value": 82 }
                            ]
                        }
                    }
                }),
            )
    }

    async fn timestamps(api: &MockApi, request: DeviceDataRequest) -> Vec<String> {
        api.get_device_data_tree(&request)
            .await
            .unwrap()
            .to_linearized_data()
            .iter()
            .filter_map(LinearizedRecord::timestamp)
            .map(format_timestamp)
            .collect()
    }

    #[test]
    fn test_request_query() {
        let request = DeviceDataRequest::new(DEVICE_ID, INTERFACE)
            .path("sensors/light/")
            .since(t1())
            .to(t2())
            .limit(10)
            .keep_milliseconds(true);

        assert_eq!(request.endpoint(), "/sensors/light");
        assert_eq!(
            request.query(),
            vec![
                ("since", "2020-10-14T12:27:02.000Z".to_string()),
                ("to", "2020-10-14T12:27:13.000Z".to_string()),
                ("limit", "10".to_string()),
                ("keep_milliseconds", "true".to_string()),
            ]
        );
        assert!(DeviceDataRequest::new(DEVICE_ID, INTERFACE).query().is_empty());
        assert_eq!(DeviceDataRequest::new(DEVICE_ID, INTERFACE).endpoint(), "");
    }

    #[test]
    fn test_data_body() {
        assert_eq!(
            data_body(&AstarteValue::LongInteger(42)),
            json!({ "data": "42" })
        );
    }

    #[tokio::test]
    async fn test_device_data_tree() {
        let api = mock_api();
        let request = DeviceDataRequest::new(DEVICE_ID, INTERFACE);

        let tree = api.get_device_data_tree(&request).await.unwrap();

        assert_eq!(tree.kind, DataKind::DatastreamIndividual);
        assert_eq!(
            serde_json::to_value(tree.to_linearized_data()).unwrap(),
            json!([
                {
                    "endpoint": "/sensors/light/estimated",
                    "timestamp": "2020-10-14T12:27:02.331Z",
                    "type": "double",
                    "value": 81.0
                },
                {
                    "endpoint": "/sensors/light/estimated",
                    "timestamp": "2020-10-14T12:27:13.200Z",
                    "type": "double",
                    "value": 82.0
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_device_data_tree_for_path() {
        let api = mock_api();
        let request = DeviceDataRequest::new(DEVICE_ID, INTERFACE).path("/sensors/light");

        let tree = api.get_device_data_tree(&request).await.unwrap();

        assert_eq!(tree.root.endpoint, "/sensors/light");
        assert_eq!(tree.leaves()[0].endpoint, "/sensors/light/estimated");
        assert_eq!(tree.sample_count(), 2);
    }

    #[tokio::test]
    async fn test_filter_contract() {
        let api = mock_api();
        let t1 = "2020-10-14T12:27:02.331Z".to_string();
        let t2 = "2020-10-14T12:27:13.200Z".to_string();
        let at = |timestamp: &str| DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc);
        let request = || DeviceDataRequest::new(DEVICE_ID, INTERFACE);

        assert_eq!(
            timestamps(&api, request().since(at(&t2))).await,
            vec![t2.clone()]
        );
        assert_eq!(
            timestamps(&api, request().to(at(&t1))).await,
            vec![t1.clone()]
        );
        assert!(timestamps(&api, request().since_after(at(&t2)))
            .await
            .is_empty());
        assert_eq!(timestamps(&api, request().limit(1)).await, vec![t2.clone()]);
        assert_eq!(
            timestamps(&api, request().since_after(at(&t1)).to(at(&t2))).await,
            vec![t2]
        );
    }

    #[tokio::test]
    async fn test_interface_not_installed() {
        let api = mock_api();
        let request = DeviceDataRequest::new(DEVICE_ID, "org.example.Missing");

        let err = api.get_device_data_tree(&request).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::InterfaceNotInIntrospection {
                device_id: DEVICE_ID.to_string(),
                interface_name: "org.example.Missing".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_http_failures_propagate() {
        let api = mock_api();
        let request = DeviceDataRequest::new("unknown-device", INTERFACE);

        let err = api.get_device_data_tree(&request).await.unwrap_err();

        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_installed_major_is_used() {
        let api = mock_api().with_interface(json!({
            "interface_name": INTERFACE,
            "version_major": 1,
            "version_minor": 0,
            "type": "datastream",
            "ownership": "device",
            "mappings": [{ "endpoint": "/%{sensor_id}/light/estimated", "type": "string" }]
        }));
        let request = DeviceDataRequest::new(DEVICE_ID, INTERFACE);

        let tree = api.get_device_data_tree(&request).await.unwrap();

        let LinearizedRecord::Individual(record) = &tree.to_linearized_data()[0] else {
            panic!("expected an individual record");
        };
        assert_eq!(record.value, AstarteValue::Double(81.0));
    }

    #[test]
    fn test_urls() {
        let session = Session::new("test", "e30.e30.sig").unwrap();
        let urls = ApiUrls {
            appengine: "http://localhost:4002".to_string(),
            realm_management: "http://localhost:4000".to_string(),
            pairing: "http://localhost:4003".to_string(),
            flow: "http://localhost:4009".to_string(),
        };
        let client = AstarteClient::new(urls, session);

        assert_eq!(
            client.device_data_url(DEVICE_ID, INTERFACE, "/sensors"),
            format!("http://localhost:4002/v1/test/devices/{DEVICE_ID}/interfaces/{INTERFACE}/sensors")
        );
        assert_eq!(
            client.realm_management_url("/interfaces"),
            "http://localhost:4000/v1/test/interfaces"
        );
        assert_eq!(client.session().realm(), "test");
    }
}
