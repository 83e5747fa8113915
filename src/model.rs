// Domain model: the typed values that flow between the CLI, the
// orchestrator and the remote task client. Wire shapes live in `api`;
// nothing here knows about JSON field names.

use std::fmt;

use crate::error::TaskError;

/// Default weight of the mandatory base image.
pub const BASE_IMAGE_WEIGHT: u8 = 100;
/// Default weight of every optional reference.
pub const REFERENCE_WEIGHT: u8 = 80;

/// Image generation model offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Model {
    Qwen,
    Seedream,
}

impl Model {
    /// Numeric model discriminator expected by the generate endpoint.
    pub fn type_code(&self) -> u32 {
        match self {
            Model::Qwen => 21,
            Model::Seedream => 22,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Qwen => "Qwen Image",
            Model::Seedream => "Seedream 4.0",
        }
    }
}

/// Generation flow. Modify needs a base image, create is text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Modify,
    Create,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Modify => "modify",
            Mode::Create => "create",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetKind {
    ImageRef,
    StyleRef,
    CharRef,
    ContourRef,
    DepthRef,
    CompositionRef,
}

impl PresetKind {
    /// Optional kinds in the order the interactive flow asks for them.
    pub const OPTIONAL: [PresetKind; 5] = [
        PresetKind::StyleRef,
        PresetKind::CharRef,
        PresetKind::ContourRef,
        PresetKind::DepthRef,
        PresetKind::CompositionRef,
    ];

    pub fn type_code(&self) -> u32 {
        match self {
            PresetKind::ImageRef => 1,
            PresetKind::StyleRef => 2,
            PresetKind::CharRef => 3,
            PresetKind::ContourRef => 8,
            PresetKind::DepthRef => 9,
            PresetKind::CompositionRef => 10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresetKind::ImageRef => "Base Image",
            PresetKind::StyleRef => "Style Reference",
            PresetKind::CharRef => "Character Reference",
            PresetKind::ContourRef => "Contour Reference",
            PresetKind::DepthRef => "Depth Reference",
            PresetKind::CompositionRef => "Composition Reference",
        }
    }

    pub fn default_weight(&self) -> u8 {
        match self {
            PresetKind::ImageRef => BASE_IMAGE_WEIGHT,
            _ => REFERENCE_WEIGHT,
        }
    }
}

/// A weighted, typed reference image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePreset {
    pub kind: PresetKind,
    pub weight: u8,
    pub url: String,
}

impl ReferencePreset {
    /// Build a preset, falling back to the kind's default weight when the
    /// given one is outside 0..=100.
    pub fn new(kind: PresetKind, weight: Option<u8>, url: impl Into<String>) -> Self {
        let weight = weight
            .filter(|w| *w <= 100)
            .unwrap_or_else(|| kind.default_weight());
        Self {
            kind,
            weight,
            url: url.into(),
        }
    }
}

/// Parse a user supplied weight. Anything that is not a plain integer in
/// 0..=100 yields `default`.
pub fn parse_weight(raw: &str, default: u8) -> u8 {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return default;
    }
    match raw.parse::<u32>() {
        Ok(w) if w <= 100 => w as u8,
        _ => default,
    }
}

/// Reference URLs as they come from the command line, grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct ReferenceUrls {
    pub base_image: Option<String>,
    pub style: Vec<String>,
    pub character: Vec<String>,
    pub contour: Vec<String>,
    pub depth: Vec<String>,
    pub composition: Vec<String>,
}

impl ReferenceUrls {
    /// Turn argument-supplied URLs into presets with default weights. The
    /// base image, when given, comes first.
    pub fn into_presets(self) -> Vec<ReferencePreset> {
        let mut presets: Vec<ReferencePreset> = self
            .base_image
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| ReferencePreset::new(PresetKind::ImageRef, None, u))
            .into_iter()
            .collect();
        let groups = [
            (PresetKind::StyleRef, self.style),
            (PresetKind::CharRef, self.character),
            (PresetKind::ContourRef, self.contour),
            (PresetKind::DepthRef, self.depth),
            (PresetKind::CompositionRef, self.composition),
        ];
        for (kind, urls) in groups {
            presets.extend(
                urls.iter()
                    .map(|u| u.trim())
                    .filter(|u| !u.is_empty())
                    .map(|u| ReferencePreset::new(kind, None, u)),
            );
        }
        presets
    }
}

/// Number of images per prompt, always within 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCount(u8);

impl ImageCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn clamped(n: i64) -> Self {
        Self(n.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for ImageCount {
    fn default() -> Self {
        Self(1)
    }
}

/// One unit of work: a single prompt submitted as one remote task.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: Model,
    pub mode: Mode,
    pub image_count: ImageCount,
    pub presets: Vec<ReferencePreset>,
}

impl GenerationRequest {
    /// Check local preconditions. Modify mode needs exactly one base image.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.prompt.trim().is_empty() {
            return Err(TaskError::Precondition("prompt is empty".into()));
        }
        if self.mode == Mode::Modify {
            let bases = self
                .presets
                .iter()
                .filter(|p| p.kind == PresetKind::ImageRef)
                .count();
            match bases {
                0 => {
                    return Err(TaskError::Precondition(
                        "modify mode requires an image_ref (base image URL)".into(),
                    ))
                }
                1 => {}
                n => {
                    return Err(TaskError::Precondition(format!(
                        "modify mode takes exactly one image_ref, got {n}"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Build one request per prompt, all sharing the same presets.
pub fn build_requests(
    prompts: &[String],
    model: Model,
    mode: Mode,
    image_count: ImageCount,
    presets: &[ReferencePreset],
) -> Vec<GenerationRequest> {
    prompts
        .iter()
        .map(|prompt| GenerationRequest {
            prompt: prompt.clone(),
            model,
            mode,
            image_count,
            presets: presets.to_vec(),
        })
        .collect()
}

/// Identifier of a remote task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse reading of a status ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    Complete,
    Failed,
}

/// Status ordinal reported by the service. `None` means no value yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus(pub Option<i64>);

impl TaskStatus {
    pub const COMPLETE: i64 = 100;
    pub const FAILED_FROM: i64 = 400;

    pub fn phase(&self) -> Phase {
        match self.0 {
            Some(Self::COMPLETE) => Phase::Complete,
            Some(code) if code >= Self::FAILED_FROM => Phase::Failed,
            _ => Phase::InProgress,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{code}"),
            None => f.write_str("pending"),
        }
    }
}

/// URL of one produced image and its 1-based position in the task's
/// image list. Entries without a URL still take up a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub position: usize,
    pub url: String,
}

impl AssetReference {
    pub fn new(position: usize, url: impl Into<String>) -> Self {
        Self {
            position,
            url: url.into(),
        }
    }
}
