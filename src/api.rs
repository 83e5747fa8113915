// Remote task client: a small blocking HTTP client for the imaging
// integration API. Every call is one request/response exchange, no
// retries. Wire shapes are private to this module; callers only see the
// typed values from `model`.

use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TaskError};
use crate::model::{AssetReference, GenerationRequest, Model, TaskHandle, TaskStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.fusara.ai";
const GENERATE_PATH: &str = "/api/integration/imaging/generate";
const TASKS_PATH: &str = "/api/integration/imaging/tasks";
const API_KEY_HEADER: &str = "x-api-key";
/// Response bodies quoted in diagnostics are cut to this many characters.
const BODY_SNIPPET: usize = 300;

/// The three service operations plus the raw asset download.
pub trait TaskApi {
    fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle>;
    fn status(&self, handle: &TaskHandle) -> Result<TaskStatus>;
    fn result(&self, handle: &TaskHandle) -> Result<Vec<AssetReference>>;
    fn fetch_asset(&self, asset: &AssetReference) -> Result<Vec<u8>>;
}

/// Connection settings, fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            insecure: false,
        }
    }
}

/// Blocking client for the imaging API. The API key is sent as a header on
/// every service call but never on asset downloads.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: HeaderValue,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    #[serde(rename = "__type")]
    type_code: u32,
    #[serde(rename = "Prompt")]
    prompt: &'a str,
    #[serde(rename = "NumberOfImages")]
    number_of_images: u8,
    #[serde(rename = "TaskPresets")]
    task_presets: Vec<PresetBody<'a>>,
    #[serde(flatten)]
    defaults: ModelDefaults,
}

#[derive(Serialize)]
struct PresetBody<'a> {
    #[serde(rename = "__type")]
    type_code: u32,
    #[serde(rename = "Weight")]
    weight: u8,
    #[serde(rename = "ExternalUrl")]
    external_url: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ModelDefaults {
    Qwen(QwenDefaults),
    Seedream(SeedreamDefaults),
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct QwenDefaults {
    width: u32,
    height: u32,
    number_of_inference_steps: u32,
    guidance_scale: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SeedreamDefaults {
    size: &'static str,
    guidance_scale: f64,
}

impl ModelDefaults {
    fn for_model(model: Model) -> Self {
        match model {
            Model::Qwen => ModelDefaults::Qwen(QwenDefaults {
                width: 1024,
                height: 1024,
                number_of_inference_steps: 50,
                guidance_scale: 4.0,
            }),
            Model::Seedream => ModelDefaults::Seedream(SeedreamDefaults {
                size: "1024x1024",
                guidance_scale: 2.5,
            }),
        }
    }
}

impl<'a> SubmitBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        SubmitBody {
            type_code: request.model.type_code(),
            prompt: &request.prompt,
            number_of_images: request.image_count.get(),
            task_presets: request
                .presets
                .iter()
                .map(|p| PresetBody {
                    type_code: p.kind.type_code(),
                    weight: p.weight,
                    external_url: &p.url,
                })
                .collect(),
            defaults: ModelDefaults::for_model(request.model),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct SubmitData {
    #[serde(rename = "taskId")]
    task_id: Option<Value>,
}

#[derive(Deserialize)]
struct TaskData {
    #[serde(default)]
    images: Vec<AssetEntry>,
}

#[derive(Deserialize)]
struct AssetEntry {
    url: Option<Value>,
}

/// Task ids come back either as strings or as numbers.
fn handle_from_value(value: &Value) -> Option<TaskHandle> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(TaskHandle::new(s.trim())),
        Value::Number(n) => Some(TaskHandle::new(n.to_string())),
        _ => None,
    }
}

fn status_from_value(value: Option<&Value>) -> TaskStatus {
    let code = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    TaskStatus(code)
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET).collect()
}

/// Read the body of a non-success response for diagnostics.
fn failure_parts(res: Response) -> (u16, String) {
    let status = res.status().as_u16();
    let body = res.text().unwrap_or_default();
    (status, snippet(&body))
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|_| TaskError::Precondition("API key contains invalid characters".into()))?;
        api_key.set_sensitive(true);

        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, self.api_key.clone());
        headers
    }

    pub fn generate_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    fn task_url(&self, handle: &TaskHandle) -> String {
        format!("{}{}/{}", self.base_url, TASKS_PATH, handle)
    }
}

impl TaskApi for ApiClient {
    fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        let body = SubmitBody::from_request(request);
        let res = self
            .client
            .post(self.generate_url())
            .headers(self.headers())
            .json(&body)
            .send()?;
        if !res.status().is_success() {
            let (status, body) = failure_parts(res);
            return Err(TaskError::Submit { status, body });
        }

        let text = res.text()?;
        debug!("submit response: {text}");
        let envelope: Envelope<SubmitData> = serde_json::from_str(&text)?;
        envelope
            .data
            .and_then(|d| d.task_id)
            .as_ref()
            .and_then(handle_from_value)
            .ok_or_else(|| TaskError::MissingHandle {
                body: snippet(&text),
            })
    }

    fn status(&self, handle: &TaskHandle) -> Result<TaskStatus> {
        let url = format!("{}/status", self.task_url(handle));
        let res = self.client.get(url).headers(self.headers()).send()?;
        if !res.status().is_success() {
            let (status, body) = failure_parts(res);
            return Err(TaskError::Status { status, body });
        }
        let envelope: Envelope<Value> = res.json()?;
        Ok(status_from_value(envelope.data.as_ref()))
    }

    fn result(&self, handle: &TaskHandle) -> Result<Vec<AssetReference>> {
        let res = self
            .client
            .get(self.task_url(handle))
            .headers(self.headers())
            .send()?;
        if !res.status().is_success() {
            let (status, body) = failure_parts(res);
            return Err(TaskError::Result { status, body });
        }
        let envelope: Envelope<TaskData> = res.json()?;
        let Some(data) = envelope.data else {
            return Ok(Vec::new());
        };
        // positions count every entry, including the ones without a URL
        let assets = data
            .images
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry.url {
                Some(Value::String(url)) if !url.trim().is_empty() => {
                    Some(AssetReference::new(i + 1, url.trim()))
                }
                _ => None,
            })
            .collect();
        Ok(assets)
    }

    fn fetch_asset(&self, asset: &AssetReference) -> Result<Vec<u8>> {
        let res = self.client.get(&asset.url).send()?;
        if !res.status().is_success() {
            return Err(TaskError::AssetFetch {
                url: asset.url.clone(),
                status: res.status().as_u16(),
            });
        }
        Ok(res.bytes()?.to_vec())
    }
}
