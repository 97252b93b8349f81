//! AWS Rekognition adapter.
//!
//! Speaks the JSON 1.1 protocol with SigV4 signing. Image analysis issues
//! one Detect* call per requested feature. Video analysis starts one job per
//! feature against an S3 object and polls the matching Get* action until
//! every job finishes or the call timeout elapses.

use crate::http::{self, send_json};
use crate::openai::missing_credential;
use crate::sigv4::{AwsCredentials, SigV4Signer};
use async_trait::async_trait;
use chrono::Utc;
use gateway_config::ProviderConfig;
use gateway_core::{
    AgeRange, AnalysisFeature, BoundingBox, DetectedFace, DetectedLabel, DetectedObject,
    DetectedText, GatewayError, GatewayResult, ImageAnalysisOutput, ImageAnalysisRequest,
    ModerationSummary, OperationInput, OperationOutput, OperationType, ProviderAdapter,
    ProviderKind, ProviderRawResult, VideoAnalysisOutput, VideoAnalysisRequest, VideoFace,
    VideoObject, VideoScene, VideoText,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Interval between Get* polls for video jobs
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const MIN_CONFIDENCE: f64 = 50.0;

const OPERATIONS: &[OperationType] = &[OperationType::ImageAnalysis, OperationType::VideoAnalysis];

/// Adapter for AWS Rekognition
pub struct RekognitionAdapter {
    endpoint: String,
    signer: SigV4Signer,
    poll_interval: Duration,
    client: Client,
}

impl std::fmt::Debug for RekognitionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RekognitionAdapter")
            .field("endpoint", &self.endpoint)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl RekognitionAdapter {
    /// Create the adapter. `api_key` holds the access key id and
    /// `secret_key` the secret access key.
    ///
    /// # Errors
    /// Returns a validation error if either key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        let kind = ProviderKind::AwsRekognition;
        let access_key_id = config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_credential(kind, "api_key"))?;
        let secret_access_key = config
            .secret_key
            .clone()
            .ok_or_else(|| missing_credential(kind, "secret_key"))?;
        let credentials = AwsCredentials {
            access_key_id: access_key_id.expose_secret().clone(),
            secret_access_key,
            session_token: config.session_token.clone(),
        };
        let region = config.region_or_default().to_string();

        Ok(Self {
            endpoint: config
                .endpoint()
                .unwrap_or_else(|| format!("https://rekognition.{region}.amazonaws.com")),
            signer: SigV4Signer::new(credentials, region, "rekognition"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    /// Override the video job poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        body: &Value,
        timeout: Duration,
    ) -> GatewayResult<(T, Value)> {
        let url = format!("{}/", self.endpoint);
        let payload = serde_json::to_vec(body)
            .map_err(|e| GatewayError::unknown(format!("Failed to encode {action} request: {e}")))?;
        let target = format!("RekognitionService.{action}");
        let headers = self.signer.sign(
            &url,
            &[
                ("content-type", "application/x-amz-json-1.1"),
                ("x-amz-target", target.as_str()),
            ],
            &payload,
            Utc::now(),
        )?;

        let mut request = self.client.post(&url).body(payload);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        debug!(provider = %self.kind(), action = %action, "Calling Rekognition");
        send_json(self.kind(), request, timeout).await
    }

    async fn image_source(&self, image: &str, timeout: Duration) -> GatewayResult<Value> {
        if let Some((bucket, name)) = parse_s3(image) {
            return Ok(json!({"S3Object": {"Bucket": bucket, "Name": name}}));
        }
        let media = http::load_media(&self.client, self.kind(), "image", image, timeout).await?;
        Ok(json!({"Bytes": http::encode_base64(&media.data)}))
    }

    async fn analyze_image(
        &self,
        request: &ImageAnalysisRequest,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let image = self.image_source(&request.image, timeout).await?;
        let features = request.effective_features();
        let mut output = ImageAnalysisOutput::default();
        let mut raw = Map::new();

        let wants_objects = features.contains(&AnalysisFeature::Objects);
        let wants_labels = features.contains(&AnalysisFeature::Labels);
        if wants_objects || wants_labels {
            let body = json!({"Image": image, "MaxLabels": 50, "MinConfidence": MIN_CONFIDENCE});
            let (response, value): (DetectLabelsResponse, Value) =
                self.call("DetectLabels", &body, timeout).await?;
            if wants_labels {
                output.labels = Some(
                    response
                        .labels
                        .iter()
                        .map(|l| DetectedLabel {
                            name: l.name.clone(),
                            confidence: ratio(l.confidence),
                        })
                        .collect(),
                );
            }
            if wants_objects {
                output.objects =
                    Some(response.labels.iter().flat_map(objects_from_label).collect());
            }
            raw.insert("DetectLabels".to_string(), value);
        }

        if features.contains(&AnalysisFeature::Faces) {
            let body = json!({"Image": image, "Attributes": ["ALL"]});
            let (response, value): (DetectFacesResponse, Value) =
                self.call("DetectFaces", &body, timeout).await?;
            output.faces = Some(
                response
                    .face_details
                    .into_iter()
                    .map(|face| DetectedFace {
                        bounding_box: face.bounding_box.into(),
                        emotions: emotions(&face.emotions),
                        age: face.age_range.map(|a| AgeRange { low: a.low, high: a.high }),
                        gender: face.gender.map(|g| g.value),
                        confidence: ratio(face.confidence),
                    })
                    .collect(),
            );
            raw.insert("DetectFaces".to_string(), value);
        }

        if features.contains(&AnalysisFeature::Text) {
            let body = json!({"Image": image});
            let (response, value): (DetectTextResponse, Value) =
                self.call("DetectText", &body, timeout).await?;
            output.text = Some(
                response
                    .text_detections
                    .into_iter()
                    .filter(|t| t.detection_type == "LINE")
                    .map(|t| DetectedText {
                        content: t.detected_text,
                        bounding_box: t.geometry.map(|g| g.bounding_box.into()),
                        confidence: ratio(t.confidence),
                    })
                    .collect(),
            );
            raw.insert("DetectText".to_string(), value);
        }

        if features.contains(&AnalysisFeature::Moderation) {
            let body = json!({"Image": image, "MinConfidence": MIN_CONFIDENCE});
            let (response, value): (DetectModerationResponse, Value) =
                self.call("DetectModerationLabels", &body, timeout).await?;
            output.moderation = Some(moderation_summary(
                response.moderation_labels.iter().map(|l| (l.name.as_str(), l.confidence)),
            ));
            raw.insert("DetectModerationLabels".to_string(), value);
        }

        Ok(ProviderRawResult::new(OperationOutput::ImageAnalysis(output), Value::Object(raw)))
    }

    async fn analyze_video(
        &self,
        request: &VideoAnalysisRequest,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let Some((bucket, name)) = parse_s3(&request.video) else {
            return Err(GatewayError::validation(
                "video must be an s3://bucket/key location",
                Some("video".to_string()),
                "invalid_video_source",
            ));
        };
        let video = json!({"S3Object": {"Bucket": bucket, "Name": name}});

        let mut jobs: Vec<VideoJob> = Vec::new();
        for feature in request.effective_features() {
            let job = VideoJob::for_feature(feature);
            if jobs.iter().any(|j| j.start == job.start) {
                continue;
            }
            jobs.push(job);
        }

        let run = async {
            let mut started = Vec::with_capacity(jobs.len());
            for job in &jobs {
                let mut body = json!({"Video": video});
                if let (Value::Object(target), Value::Object(extra)) =
                    (&mut body, job.start_params())
                {
                    target.extend(extra);
                }
                let (response, _): (StartJobResponse, Value) =
                    self.call(job.start, &body, timeout).await?;
                info!(
                    provider = %self.kind(),
                    action = %job.start,
                    job_id = %response.job_id,
                    "Video job started"
                );
                started.push((job, response.job_id));
            }

            let mut pages = Vec::with_capacity(started.len());
            for (job, job_id) in started {
                pages.push((job.feature, self.wait_for_job(job, &job_id, timeout).await?));
            }
            Ok::<_, GatewayError>(pages)
        };
        let pages = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| GatewayError::timeout(self.kind(), timeout))??;

        let window = TimeWindow {
            start: request.start_time,
            end: request.end_time,
        };
        let mut output = VideoAnalysisOutput::default();
        let mut raw = Map::new();
        for (feature, results) in pages {
            raw.insert(feature_key(feature).to_string(), Value::Array(results.clone()));
            apply_video_results(&mut output, feature, results, &window)?;
        }
        Ok(ProviderRawResult::new(OperationOutput::VideoAnalysis(output), Value::Object(raw)))
    }

    /// Poll a job until it settles, then collect every result page
    async fn wait_for_job(
        &self,
        job: &VideoJob,
        job_id: &str,
        timeout: Duration,
    ) -> GatewayResult<Vec<Value>> {
        let mut pages = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut body = json!({"JobId": job_id, "MaxResults": 1000});
            if job.sort_by_timestamp {
                body["SortBy"] = json!("TIMESTAMP");
            }
            if let Some(token) = &next_token {
                body["NextToken"] = json!(token);
            }
            let (status, value): (JobStatusResponse, Value) =
                self.call(job.get, &body, timeout).await?;
            match status.job_status.as_str() {
                "SUCCEEDED" => {
                    pages.push(value);
                    match status.next_token {
                        Some(token) => next_token = Some(token),
                        None => return Ok(pages),
                    }
                }
                "FAILED" => {
                    return Err(GatewayError::provider(
                        self.kind(),
                        format!(
                            "{} job {job_id} failed: {}",
                            job.get,
                            status.status_message.unwrap_or_else(|| "no reason given".to_string())
                        ),
                        None,
                        false,
                    ));
                }
                _ => {
                    debug!(provider = %self.kind(), job_id = %job_id, "Video job in progress");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl ProviderAdapter for RekognitionAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AwsRekognition
    }

    fn supported_operations(&self) -> &[OperationType] {
        OPERATIONS
    }

    async fn execute(
        &self,
        input: &OperationInput,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        match input {
            OperationInput::ImageAnalysis(r) => self.analyze_image(r, timeout).await,
            OperationInput::VideoAnalysis(r) => self.analyze_video(r, timeout).await,
            other => Err(http::unsupported(self.kind(), other.operation_type())),
        }
    }
}

/// Start/Get action pair for one video feature
#[derive(Debug, Clone, Copy)]
struct VideoJob {
    feature: AnalysisFeature,
    start: &'static str,
    get: &'static str,
    sort_by_timestamp: bool,
}

impl VideoJob {
    const fn for_feature(feature: AnalysisFeature) -> Self {
        let (start, get, sort_by_timestamp) = match feature {
            AnalysisFeature::Objects | AnalysisFeature::Labels => {
                ("StartLabelDetection", "GetLabelDetection", true)
            }
            AnalysisFeature::Faces => ("StartFaceDetection", "GetFaceDetection", false),
            AnalysisFeature::Text => ("StartTextDetection", "GetTextDetection", false),
            AnalysisFeature::Moderation => ("StartContentModeration", "GetContentModeration", true),
            AnalysisFeature::Scenes => ("StartSegmentDetection", "GetSegmentDetection", false),
        };
        Self {
            feature,
            start,
            get,
            sort_by_timestamp,
        }
    }

    fn start_params(&self) -> Value {
        match self.feature {
            AnalysisFeature::Objects | AnalysisFeature::Labels | AnalysisFeature::Moderation => {
                json!({"MinConfidence": MIN_CONFIDENCE})
            }
            AnalysisFeature::Faces => json!({"FaceAttributes": "ALL"}),
            AnalysisFeature::Text => json!({}),
            AnalysisFeature::Scenes => json!({"SegmentTypes": ["SHOT"]}),
        }
    }
}

const fn feature_key(feature: AnalysisFeature) -> &'static str {
    match feature {
        AnalysisFeature::Objects | AnalysisFeature::Labels => "labels",
        AnalysisFeature::Faces => "faces",
        AnalysisFeature::Text => "text",
        AnalysisFeature::Moderation => "moderation",
        AnalysisFeature::Scenes => "scenes",
    }
}

/// Requested time range in seconds
struct TimeWindow {
    start: Option<f64>,
    end: Option<f64>,
}

impl TimeWindow {
    fn contains(&self, seconds: f64) -> bool {
        self.start.map_or(true, |s| seconds >= s) && self.end.map_or(true, |e| seconds <= e)
    }
}

fn parse_pages<T: DeserializeOwned>(pages: Vec<Value>) -> GatewayResult<Vec<T>> {
    pages
        .into_iter()
        .map(|page| {
            serde_json::from_value(page).map_err(|e| {
                GatewayError::provider(
                    ProviderKind::AwsRekognition,
                    format!("Unexpected response shape: {e}"),
                    None,
                    false,
                )
            })
        })
        .collect()
}

fn apply_video_results(
    output: &mut VideoAnalysisOutput,
    feature: AnalysisFeature,
    pages: Vec<Value>,
    window: &TimeWindow,
) -> GatewayResult<()> {
    match feature {
        AnalysisFeature::Objects | AnalysisFeature::Labels => {
            let pages: Vec<GetLabelsResponse> = parse_pages(pages)?;
            let objects = pages
                .into_iter()
                .flat_map(|p| p.labels)
                .filter(|l| window.contains(seconds(l.timestamp)))
                .map(|l| VideoObject {
                    name: l.label.name,
                    confidence: ratio(l.label.confidence),
                    timestamp: seconds(l.timestamp),
                    bounding_box: l
                        .label
                        .instances
                        .into_iter()
                        .next()
                        .map(|i| i.bounding_box.into()),
                })
                .collect();
            output.objects = Some(objects);
        }
        AnalysisFeature::Faces => {
            let pages: Vec<GetFacesResponse> = parse_pages(pages)?;
            let faces = pages
                .into_iter()
                .flat_map(|p| p.faces)
                .filter(|f| window.contains(seconds(f.timestamp)))
                .map(|f| VideoFace {
                    timestamp: seconds(f.timestamp),
                    emotions: emotions(&f.face.emotions),
                    bounding_box: f.face.bounding_box.into(),
                    confidence: ratio(f.face.confidence),
                })
                .collect();
            output.faces = Some(faces);
        }
        AnalysisFeature::Text => {
            let pages: Vec<GetTextResponse> = parse_pages(pages)?;
            let text = pages
                .into_iter()
                .flat_map(|p| p.text_detections)
                .filter(|t| {
                    t.text_detection.detection_type == "LINE"
                        && window.contains(seconds(t.timestamp))
                })
                .map(|t| VideoText {
                    content: t.text_detection.detected_text,
                    timestamp: seconds(t.timestamp),
                    bounding_box: t.text_detection.geometry.map(|g| g.bounding_box.into()),
                    confidence: ratio(t.text_detection.confidence),
                })
                .collect();
            output.text = Some(text);
        }
        AnalysisFeature::Moderation => {
            let pages: Vec<GetModerationResponse> = parse_pages(pages)?;
            let labels: Vec<_> = pages
                .into_iter()
                .flat_map(|p| p.moderation_labels)
                .filter(|l| window.contains(seconds(l.timestamp)))
                .collect();
            output.moderation = Some(moderation_summary(
                labels
                    .iter()
                    .map(|l| (l.moderation_label.name.as_str(), l.moderation_label.confidence)),
            ));
        }
        AnalysisFeature::Scenes => {
            let pages: Vec<GetSegmentsResponse> = parse_pages(pages)?;
            let scenes = pages
                .into_iter()
                .flat_map(|p| p.segments)
                .filter(|s| window.contains(seconds(s.start_timestamp_millis)))
                .map(|s| {
                    let index = s.shot_segment.as_ref().map_or(0, |shot| shot.index);
                    let confidence = s.shot_segment.as_ref().map_or(0.0, |shot| shot.confidence);
                    VideoScene {
                        start_time: seconds(s.start_timestamp_millis),
                        end_time: seconds(s.end_timestamp_millis),
                        description: format!("{} {index}", s.segment_type.to_lowercase()),
                        confidence: ratio(confidence),
                    }
                })
                .collect();
            output.scenes = Some(scenes);
        }
    }
    Ok(())
}

/// Split `s3://bucket/key`
fn parse_s3(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    (!bucket.is_empty() && !key.is_empty()).then_some((bucket, key))
}

/// Rekognition reports confidences as percentages
fn ratio(percent: f64) -> f64 {
    (percent / 100.0).clamp(0.0, 1.0)
}

#[allow(clippy::cast_precision_loss)]
fn seconds(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

fn emotions(list: &[Emotion]) -> Option<BTreeMap<String, f64>> {
    (!list.is_empty()).then(|| {
        list.iter()
            .map(|e| (e.emotion_type.to_lowercase(), ratio(e.confidence)))
            .collect()
    })
}

fn objects_from_label(label: &Label) -> Vec<DetectedObject> {
    label
        .instances
        .iter()
        .map(|instance| DetectedObject {
            name: label.name.clone(),
            confidence: ratio(instance.confidence.unwrap_or(label.confidence)),
            bounding_box: Some(instance.bounding_box.clone().into()),
        })
        .collect()
}

fn moderation_summary<'a>(labels: impl Iterator<Item = (&'a str, f64)>) -> ModerationSummary {
    let mut categories: BTreeMap<String, f64> = BTreeMap::new();
    for (name, confidence) in labels {
        let score = categories.entry(name.to_string()).or_insert(0.0);
        *score = score.max(ratio(confidence));
    }
    ModerationSummary {
        flagged: !categories.is_empty(),
        categories,
    }
}

// ===== API Types =====

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireBox {
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

impl From<WireBox> for BoundingBox {
    fn from(b: WireBox) -> Self {
        Self {
            x: b.left,
            y: b.top,
            width: b.width,
            height: b.height,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    bounding_box: WireBox,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Label {
    name: String,
    confidence: f64,
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Emotion {
    #[serde(rename = "Type")]
    emotion_type: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAgeRange {
    low: u32,
    high: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Gender {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaceDetail {
    bounding_box: WireBox,
    #[serde(default)]
    age_range: Option<WireAgeRange>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    emotions: Vec<Emotion>,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectFacesResponse {
    #[serde(default)]
    face_details: Vec<FaceDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Geometry {
    bounding_box: WireBox,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextDetection {
    detected_text: String,
    #[serde(rename = "Type")]
    detection_type: String,
    confidence: f64,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectTextResponse {
    #[serde(default)]
    text_detections: Vec<TextDetection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModerationLabel {
    name: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectModerationResponse {
    #[serde(default)]
    moderation_labels: Vec<ModerationLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartJobResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobStatusResponse {
    job_status: String,
    status_message: Option<String>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimedLabel {
    timestamp: u64,
    label: Label,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetLabelsResponse {
    #[serde(default)]
    labels: Vec<TimedLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimedFace {
    timestamp: u64,
    face: FaceDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetFacesResponse {
    #[serde(default)]
    faces: Vec<TimedFace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimedText {
    timestamp: u64,
    text_detection: TextDetection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTextResponse {
    #[serde(default)]
    text_detections: Vec<TimedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimedModerationLabel {
    timestamp: u64,
    moderation_label: ModerationLabel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetModerationResponse {
    #[serde(default)]
    moderation_labels: Vec<TimedModerationLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShotSegment {
    index: u64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Segment {
    #[serde(rename = "Type")]
    segment_type: String,
    start_timestamp_millis: u64,
    end_timestamp_millis: u64,
    shot_segment: Option<ShotSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSegmentsResponse {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn adapter(server: &MockServer) -> RekognitionAdapter {
        let config = ProviderConfig::new(ProviderKind::AwsRekognition)
            .with_api_key("AKIDEXAMPLE")
            .with_secret_key("secret")
            .with_region("eu-west-1")
            .with_base_url(server.uri());
        RekognitionAdapter::new(&config, TIMEOUT)
            .expect("adapter")
            .with_poll_interval(Duration::from_millis(10))
    }

    fn target(action: &str) -> wiremock::matchers::HeaderExactMatcher {
        header("x-amz-target", format!("RekognitionService.{action}").as_str())
    }

    #[test]
    fn test_parse_s3() {
        assert_eq!(parse_s3("s3://bucket/path/clip.mp4"), Some(("bucket", "path/clip.mp4")));
        assert_eq!(parse_s3("s3://bucket"), None);
        assert_eq!(parse_s3("https://example.com/a.mp4"), None);
    }

    #[test]
    fn test_requires_secret_key() {
        let config = ProviderConfig::new(ProviderKind::AwsRekognition).with_api_key("AKID");
        let err = RekognitionAdapter::new(&config, TIMEOUT).expect_err("missing secret");
        assert!(matches!(err, GatewayError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_image_labels_and_objects_share_one_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target("DetectLabels"))
            .and(header_exists("authorization"))
            .and(body_partial_json(
                json!({"Image": {"S3Object": {"Bucket": "photos", "Name": "dog.jpg"}}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Labels": [
                    {"Name": "Dog", "Confidence": 98.0, "Instances": [
                        {"BoundingBox": {"Left": 0.1, "Top": 0.2, "Width": 0.3, "Height": 0.4}, "Confidence": 97.0}
                    ]},
                    {"Name": "Grass", "Confidence": 80.0, "Instances": []}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = ImageAnalysisRequest::new("s3://photos/dog.jpg");
        request.features = Some(vec![AnalysisFeature::Labels, AnalysisFeature::Objects]);
        let result = adapter(&server)
            .execute(&OperationInput::ImageAnalysis(request), TIMEOUT)
            .await
            .expect("success");
        let OperationOutput::ImageAnalysis(output) = result.output else {
            panic!("wrong output");
        };

        let labels = output.labels.expect("labels");
        assert_eq!(labels.len(), 2);
        assert!((labels[0].confidence - 0.98).abs() < 1e-9);
        let objects = output.objects.expect("objects");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "Dog");
        assert!(output.faces.is_none());
    }

    #[tokio::test]
    async fn test_image_moderation_with_inline_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target("DetectModerationLabels"))
            .and(body_partial_json(json!({"Image": {"Bytes": "aGVsbG8="}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ModerationLabels": [{"Name": "Violence", "Confidence": 75.0, "ParentName": ""}]
            })))
            .mount(&server)
            .await;

        let mut request = ImageAnalysisRequest::new("data:image/png;base64,aGVsbG8=");
        request.features = Some(vec![AnalysisFeature::Moderation]);
        let result = adapter(&server)
            .execute(&OperationInput::ImageAnalysis(request), TIMEOUT)
            .await
            .expect("success");
        let OperationOutput::ImageAnalysis(output) = result.output else {
            panic!("wrong output");
        };
        let moderation = output.moderation.expect("moderation");
        assert!(moderation.flagged);
        assert!((moderation.categories["Violence"] - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_video_polls_until_succeeded_and_filters_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target("StartLabelDetection"))
            .and(body_partial_json(
                json!({"Video": {"S3Object": {"Bucket": "clips", "Name": "a.mp4"}}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"JobId": "job-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(target("GetLabelDetection"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"JobStatus": "IN_PROGRESS"})),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(target("GetLabelDetection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "JobStatus": "SUCCEEDED",
                "Labels": [
                    {"Timestamp": 500, "Label": {"Name": "Car", "Confidence": 90.0}},
                    {"Timestamp": 5000, "Label": {"Name": "Tree", "Confidence": 85.0}}
                ]
            })))
            .mount(&server)
            .await;

        let mut request = VideoAnalysisRequest::new("s3://clips/a.mp4");
        request.end_time = Some(2.0);
        let result = adapter(&server)
            .execute(&OperationInput::VideoAnalysis(request), TIMEOUT)
            .await
            .expect("success");
        let OperationOutput::VideoAnalysis(output) = result.output else {
            panic!("wrong output");
        };
        let objects = output.objects.expect("objects");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "Car");
        assert!((objects[0].timestamp - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_video_job_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target("StartFaceDetection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"JobId": "job-2"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(target("GetFaceDetection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "JobStatus": "FAILED",
                "StatusMessage": "Unsupported codec"
            })))
            .mount(&server)
            .await;

        let mut request = VideoAnalysisRequest::new("s3://clips/b.mp4");
        request.features = Some(vec![AnalysisFeature::Faces]);
        let err = adapter(&server)
            .execute(&OperationInput::VideoAnalysis(request), TIMEOUT)
            .await
            .expect_err("failed job");
        assert!(err.to_string().contains("Unsupported codec"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_video_requires_s3_source() {
        let server = MockServer::start().await;
        let err = adapter(&server)
            .execute(
                &OperationInput::VideoAnalysis(VideoAnalysisRequest::new(
                    "https://example.com/v.mp4",
                )),
                TIMEOUT,
            )
            .await
            .expect_err("invalid source");
        assert!(matches!(err, GatewayError::Validation { .. }));
    }
}
