//! `/accesspoints` and `/integrations` endpoints.
//!
//! Read calls that accept `allow_cache` opt into the local response cache
//! unless the `disableClientSideCaching` preference is set. Passing
//! `allow_cache = false` after a mutation fetches fresh data and replaces
//! any cached copy.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::http::{ALLOW_LOCAL_CACHE_HEADER, ALLOW_LOCAL_CACHE_VALUE, ApiRequest, Pipeline};
use crate::models::access_point::{
    AccessPoint, AccessPointStamp, EncryptionStatistic, FrequencyStatistic, ManufacturerStatistic,
    MergeOptions,
};
use crate::preferences::PreferencesService;
use crate::scope::ServerScope;

const ACCESS_POINTS: &str = "accesspoints";
const INTEGRATIONS: &str = "integrations";

/// Scan file formats accepted by the integration endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFormat {
    WigleCsv,
    AircrackngCsv,
    AircrackngCap,
    WiresharkPcap,
}

impl ScanFormat {
    pub const ALL: [ScanFormat; 4] = [
        ScanFormat::WigleCsv,
        ScanFormat::AircrackngCsv,
        ScanFormat::AircrackngCap,
        ScanFormat::WiresharkPcap,
    ];

    /// Path under `/integrations`.
    pub fn path(self) -> &'static str {
        match self {
            ScanFormat::WigleCsv => "wigle/csv",
            ScanFormat::AircrackngCsv => "aircrackng/csv",
            ScanFormat::AircrackngCap => "aircrackng/cap",
            ScanFormat::WiresharkPcap => "wireshark/pcap",
        }
    }

    /// Multipart field carrying the file.
    pub fn field(self) -> &'static str {
        match self {
            ScanFormat::WigleCsv | ScanFormat::AircrackngCsv => "scanCsvFile",
            ScanFormat::AircrackngCap | ScanFormat::WiresharkPcap => "scanPcapFile",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScanFormat::WigleCsv => "wigle-csv",
            ScanFormat::AircrackngCsv => "aircrackng-csv",
            ScanFormat::AircrackngCap => "aircrackng-cap",
            ScanFormat::WiresharkPcap => "wireshark-pcap",
        }
    }
}

impl fmt::Display for ScanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScanFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScanFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::Validation(format!("unknown scan format '{s}'")))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeBody<'a> {
    id: &'a str,
    stamp_id: &'a str,
    merge_low_signal_level: bool,
    merge_high_signal_level: bool,
    merge_ssid: bool,
    merge_security_data: bool,
}

#[derive(Clone)]
pub struct AccessPointService {
    scope: ServerScope,
    pipeline: Pipeline,
    preferences: PreferencesService,
}

impl AccessPointService {
    pub fn new(scope: ServerScope, pipeline: Pipeline, preferences: PreferencesService) -> Self {
        Self {
            scope,
            pipeline,
            preferences,
        }
    }

    // -- reads --

    pub async fn list(&self, full: bool, allow_cache: bool) -> ClientResult<Vec<AccessPoint>> {
        let path = if full { "full" } else { "" };
        let request = self.cacheable(ApiRequest::get(self.url(path)?), allow_cache);
        self.fetch(request).await
    }

    pub async fn by_id(&self, id: &str, full: bool) -> ClientResult<AccessPoint> {
        let path = if full { format!("{id}/full") } else { id.to_string() };
        self.fetch(ApiRequest::get(self.url(&path)?)).await
    }

    pub async fn run_ids(&self, full: bool) -> ClientResult<Vec<String>> {
        let path = if full { "run/full" } else { "run" };
        self.fetch(ApiRequest::get(self.url(path)?)).await
    }

    pub async fn by_run(&self, run_id: &str, full: bool) -> ClientResult<Vec<AccessPoint>> {
        let path = with_full(format!("run/{run_id}"), full);
        self.fetch(ApiRequest::get(self.url(&path)?)).await
    }

    pub async fn stamps_by_run(&self, run_id: &str, full: bool) -> ClientResult<Vec<AccessPointStamp>> {
        let path = with_full(format!("stamps/run/{run_id}"), full);
        self.fetch(ApiRequest::get(self.url(&path)?)).await
    }

    pub async fn search(&self, keyword: &str) -> ClientResult<Vec<AccessPoint>> {
        let request = ApiRequest::get(self.url("search")?).with_query("keyword", keyword);
        self.fetch(request).await
    }

    // -- statistics --

    pub async fn greatest_signal_range(
        &self,
        limit: Option<u32>,
        allow_cache: bool,
    ) -> ClientResult<Vec<AccessPoint>> {
        self.fetch(self.statistics("signal", limit, allow_cache)?).await
    }

    pub async fn frequency(
        &self,
        limit: Option<u32>,
        allow_cache: bool,
    ) -> ClientResult<Vec<FrequencyStatistic>> {
        self.fetch(self.statistics("frequency", limit, allow_cache)?).await
    }

    pub async fn most_common_manufacturer(
        &self,
        limit: Option<u32>,
        allow_cache: bool,
    ) -> ClientResult<Vec<ManufacturerStatistic>> {
        self.fetch(self.statistics("manufacturer", limit, allow_cache)?).await
    }

    pub async fn most_common_encryption(
        &self,
        limit: Option<u32>,
        allow_cache: bool,
    ) -> ClientResult<Vec<EncryptionStatistic>> {
        self.fetch(self.statistics("encryption", limit, allow_cache)?).await
    }

    // -- writes --

    pub async fn post(&self, access_points: &[AccessPoint]) -> ClientResult<()> {
        let body = json!({ "accessPoints": access_points, "scanData": Utc::now() });
        self.execute(ApiRequest::post(self.url("")?).with_json(&body)?).await
    }

    pub async fn update_note(&self, id: &str, note: &str) -> ClientResult<()> {
        let body = json!({ "id": id, "note": note });
        self.execute(ApiRequest::put(self.url("")?).with_json(&body)?).await
    }

    pub async fn set_display_status(&self, id: &str, status: bool) -> ClientResult<()> {
        let body = json!({ "id": id, "status": status });
        self.execute(ApiRequest::put(self.url("display")?).with_json(&body)?).await
    }

    pub async fn set_range_display_status(&self, ids: &[String], status: bool) -> ClientResult<()> {
        let body = json!({ "ids": ids, "status": status });
        self.execute(ApiRequest::put(self.url("range/display")?).with_json(&body)?).await
    }

    /// Fold properties of stamp `stamp_id` into access point `id`.
    pub async fn merge(&self, id: &str, stamp_id: &str, options: MergeOptions) -> ClientResult<()> {
        let body = MergeBody {
            id,
            stamp_id,
            merge_low_signal_level: options.low_signal_level,
            merge_high_signal_level: options.high_signal_level,
            merge_ssid: options.ssid,
            merge_security_data: options.security_data,
        };
        self.execute(ApiRequest::put(self.url("merge")?).with_json(&body)?).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let body = json!({ "id": id });
        self.execute(ApiRequest::delete(self.url("")?).with_json(&body)?).await
    }

    pub async fn delete_range(&self, ids: &[String]) -> ClientResult<()> {
        let body = json!({ "ids": ids });
        self.execute(ApiRequest::delete(self.url("range")?).with_json(&body)?).await
    }

    pub async fn delete_stamp(&self, id: &str, stamp_id: &str) -> ClientResult<()> {
        let body = json!({ "id": id, "stampId": stamp_id });
        self.execute(ApiRequest::delete(self.url("stamp")?).with_json(&body)?).await
    }

    // -- files --

    /// Upload a scan file. The content is forwarded as-is.
    pub async fn upload(&self, format: ScanFormat, file_name: &str, content: Vec<u8>) -> ClientResult<()> {
        let request = ApiRequest::post(self.integration_url(format.path())?).with_file(
            format.field(),
            file_name,
            content,
        );
        self.execute(request).await
    }

    /// KML export of all access points.
    pub async fn export_kml(&self, full: bool) -> ClientResult<Vec<u8>> {
        let path = if full { "kml/full" } else { "kml" };
        Ok(self.pipeline.send(ApiRequest::get(self.url(path)?)).await?.body)
    }

    /// WiGLE CSV export of all access points.
    pub async fn export_wigle_csv(&self) -> ClientResult<Vec<u8>> {
        let url = self.integration_url(ScanFormat::WigleCsv.path())?;
        Ok(self.pipeline.send(ApiRequest::get(url)).await?.body)
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.scope.endpoint(&format!("{ACCESS_POINTS}/{path}"))
    }

    fn integration_url(&self, path: &str) -> ClientResult<Url> {
        self.scope.endpoint(&format!("{INTEGRATIONS}/{path}"))
    }

    fn statistics(&self, kind: &str, limit: Option<u32>, allow_cache: bool) -> ClientResult<ApiRequest> {
        let mut request = ApiRequest::get(self.url(&format!("statistics/{kind}"))?);
        if let Some(limit) = limit {
            request = request.with_query("limit", &limit.to_string());
        }
        Ok(self.cacheable(request, allow_cache))
    }

    fn cacheable(&self, request: ApiRequest, allow_cache: bool) -> ApiRequest {
        if allow_cache && !self.preferences.caching_disabled() {
            request.with_header(ALLOW_LOCAL_CACHE_HEADER, ALLOW_LOCAL_CACHE_VALUE)
        } else {
            request
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.pipeline.send(request).await?.decode()
    }

    async fn execute(&self, request: ApiRequest) -> ClientResult<()> {
        self.pipeline.send(request).await?;
        Ok(())
    }
}

fn with_full(path: String, full: bool) -> String {
    if full { format!("{path}/full") } else { path }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::http::{ApiResponse, CacheInterceptor, RequestBody, ResponseCache, Transport};
    use crate::storage::LocalStorage;
    use crate::testing::SERVER;

    /// Records requests and answers with a fixed JSON body.
    struct Recorder {
        body: serde_json::Value,
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
            self.seen.lock().unwrap().push(request);
            ApiResponse::json(StatusCode::OK, &self.body)
        }
    }

    struct Fixture {
        recorder: Arc<Recorder>,
        preferences: PreferencesService,
        service: AccessPointService,
    }

    fn fixture(body: serde_json::Value) -> Fixture {
        let recorder = Arc::new(Recorder {
            body,
            seen: Mutex::new(Vec::new()),
        });
        let scope = ServerScope::default();
        scope.set_server(SERVER).unwrap();
        let preferences = PreferencesService::new(LocalStorage::in_memory());
        let pipeline = Pipeline::new(recorder.clone())
            .with(Arc::new(CacheInterceptor::new(ResponseCache::new())));
        Fixture {
            recorder,
            preferences: preferences.clone(),
            service: AccessPointService::new(scope, pipeline, preferences),
        }
    }

    impl Fixture {
        fn last(&self) -> ApiRequest {
            self.recorder.seen.lock().unwrap().last().cloned().unwrap()
        }

        fn calls(&self) -> usize {
            self.recorder.seen.lock().unwrap().len()
        }
    }

    #[tokio::test]
    async fn list_uses_cache_when_allowed() {
        let f = fixture(json!([{ "id": "ap-1" }]));

        let first = f.service.list(true, true).await.unwrap();
        let second = f.service.list(true, true).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.calls(), 1);
        assert_eq!(f.last().url.path(), "/api/v1/accesspoints/full");
    }

    #[tokio::test]
    async fn list_bypasses_cache_on_request() {
        let f = fixture(json!([]));
        f.service.list(false, true).await.unwrap();
        f.service.list(false, false).await.unwrap();
        assert_eq!(f.calls(), 2);
    }

    #[tokio::test]
    async fn caching_preference_disables_cache() {
        let f = fixture(json!([]));
        f.preferences
            .set_preference("disableClientSideCaching", json!(true))
            .unwrap();

        f.service.list(false, true).await.unwrap();
        f.service.list(false, true).await.unwrap();
        assert_eq!(f.calls(), 2);
    }

    #[tokio::test]
    async fn statistics_send_limit() {
        let f = fixture(json!([{ "manufacturer": "Cisco", "count": 4 }]));
        let stats = f
            .service
            .most_common_manufacturer(Some(5), false)
            .await
            .unwrap();
        assert_eq!(stats[0].manufacturer, "Cisco");

        let request = f.last();
        assert_eq!(request.url.path(), "/api/v1/accesspoints/statistics/manufacturer");
        assert_eq!(request.url.query(), Some("limit=5"));
    }

    #[tokio::test]
    async fn search_sends_keyword() {
        let f = fixture(json!([]));
        f.service.search("home net").await.unwrap();
        assert_eq!(f.last().url.query(), Some("keyword=home+net"));
    }

    #[tokio::test]
    async fn merge_sends_camel_case_flags() {
        let f = fixture(json!(null));
        let options = MergeOptions {
            ssid: true,
            ..MergeOptions::default()
        };
        f.service.merge("ap-1", "st-1", options).await.unwrap();

        let request = f.last();
        assert_eq!(request.method, Method::PUT);
        match request.body {
            RequestBody::Json(body) => {
                assert_eq!(body["stampId"], "st-1");
                assert_eq!(body["mergeSsid"], true);
                assert_eq!(body["mergeLowSignalLevel"], false);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_range_sends_ids_in_body() {
        let f = fixture(json!(null));
        f.service
            .delete_range(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let request = f.last();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.url.path(), "/api/v1/accesspoints/range");
        assert!(matches!(request.body, RequestBody::Json(ref body) if body["ids"] == json!(["a", "b"])));
    }

    #[tokio::test]
    async fn upload_targets_integration_endpoint() {
        let f = fixture(json!(null));
        f.service
            .upload(ScanFormat::WiresharkPcap, "scan.pcap", vec![1, 2, 3])
            .await
            .unwrap();

        let request = f.last();
        assert_eq!(request.url.path(), "/api/v1/integrations/wireshark/pcap");
        match request.body {
            RequestBody::File {
                field, file_name, ..
            } => {
                assert_eq!(field, "scanPcapFile");
                assert_eq!(file_name, "scan.pcap");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn requests_fail_without_server() {
        let recorder = Arc::new(Recorder {
            body: json!([]),
            seen: Mutex::new(Vec::new()),
        });
        let service = AccessPointService::new(
            ServerScope::default(),
            Pipeline::new(recorder),
            PreferencesService::new(LocalStorage::in_memory()),
        );
        assert!(matches!(
            service.run_ids(false).await,
            Err(ClientError::ServerNotConfigured)
        ));
    }

    #[test]
    fn scan_format_parses_cli_names() {
        assert_eq!("wigle-csv".parse::<ScanFormat>().unwrap(), ScanFormat::WigleCsv);
        assert_eq!(
            "Aircrackng-Cap".parse::<ScanFormat>().unwrap(),
            ScanFormat::AircrackngCap
        );
        assert!("pdf".parse::<ScanFormat>().is_err());
    }
}
