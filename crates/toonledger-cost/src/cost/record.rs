//! Call Records
//!
//! This module contains the input descriptor supplied after each generation
//! attempt and the immutable record stored in the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Platform label used when neither the caller nor the pricing table knows it
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Opaque caller metadata carried on each record
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Outcome of a generation attempt as reported by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The image was produced and is billed
    Success,
    /// The attempt failed
    Failed,
    /// The attempt failed and the caller retried it
    Retried,
}

impl CallStatus {
    /// Every status, in reporting order
    pub const ALL: [CallStatus; 3] = [Self::Success, Self::Failed, Self::Retried];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retried => "retried",
        }
    }

    /// Whether the call is billable
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel size of a generated image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageDimensions {
    /// Create from pixel counts
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create from possibly malformed signed input; non-positive sides become 0
    pub fn clamped(width: i64, height: i64) -> Self {
        let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        Self {
            width: clamp(width),
            height: clamp(height),
        }
    }

    /// Total pixel count
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Unrounded megapixels
    pub fn megapixels(&self) -> f64 {
        self.pixels() as f64 / 1_000_000.0
    }

    /// Resolution class from the longest edge: 1K, 2K or 4K
    pub fn resolution_class(&self) -> &'static str {
        match self.width.max(self.height) {
            0..=1024 => "1K",
            1025..=2048 => "2K",
            _ => "4K",
        }
    }
}

/// Token usage reported by the provider, if any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt: u64,
    /// Output tokens
    pub output: u64,
    /// Cached prompt tokens
    pub cached: u64,
}

impl TokenUsage {
    /// Create from counts
    pub const fn new(prompt: u64, output: u64, cached: u64) -> Self {
        Self {
            prompt,
            output,
            cached,
        }
    }

    pub(crate) fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt += other.prompt;
        self.output += other.output;
        self.cached += other.cached;
    }
}

/// Description of one completed generation attempt, supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    /// Pricing lookup key
    pub model: String,
    /// Panel or asset id
    pub work_item_id: String,
    /// Billing provider; falls back to the pricing table's platform
    pub platform: Option<String>,
    /// Pipeline phase label
    pub phase: Option<String>,
    /// Scene label
    pub scene_id: Option<String>,
    /// Outcome
    pub status: CallStatus,
    /// Wall time of the attempt
    pub generation_duration_ms: u64,
    /// Output size
    pub dimensions: ImageDimensions,
    /// Whether the call ran through batch processing
    pub is_batch: bool,
    /// Failure description
    pub error_message: Option<String>,
    /// Provider token usage
    pub tokens: TokenUsage,
    /// Caller metadata, passed through untouched
    pub metadata: Metadata,
}

impl CallDescriptor {
    /// Descriptor for an attempt with the given outcome
    pub fn new(
        model: impl Into<String>,
        work_item_id: impl Into<String>,
        status: CallStatus,
    ) -> Self {
        Self {
            model: model.into(),
            work_item_id: work_item_id.into(),
            platform: None,
            phase: None,
            scene_id: None,
            status,
            generation_duration_ms: 0,
            dimensions: ImageDimensions::default(),
            is_batch: false,
            error_message: None,
            tokens: TokenUsage::default(),
            metadata: Metadata::new(),
        }
    }

    /// Successful attempt
    pub fn success(model: impl Into<String>, work_item_id: impl Into<String>) -> Self {
        Self::new(model, work_item_id, CallStatus::Success)
    }

    /// Failed attempt
    pub fn failed(
        model: impl Into<String>,
        work_item_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(model, work_item_id, CallStatus::Failed).with_error(error)
    }

    /// Attempt that failed and was retried
    pub fn retried(
        model: impl Into<String>,
        work_item_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(model, work_item_id, CallStatus::Retried).with_error(error)
    }

    /// Set the platform
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the phase
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Set the scene
    #[must_use]
    pub fn with_scene(mut self, scene_id: impl Into<String>) -> Self {
        self.scene_id = Some(scene_id.into());
        self
    }

    /// Set the generation duration
    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.generation_duration_ms = ms;
        self
    }

    /// Set the output size
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = ImageDimensions::new(width, height);
        self
    }

    /// Set the output size from unvalidated signed input, e.g. a provider
    /// response. Non-positive sides become 0 and bill at the pricing
    /// model's minimum.
    #[must_use]
    pub fn with_raw_dimensions(mut self, width: i64, height: i64) -> Self {
        self.dimensions = ImageDimensions::clamped(width, height);
        self
    }

    /// Mark as a batch call
    #[must_use]
    pub fn with_batch(mut self, is_batch: bool) -> Self {
        self.is_batch = is_batch;
        self
    }

    /// Set the error message
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    /// Set token usage
    #[must_use]
    pub fn with_tokens(mut self, tokens: TokenUsage) -> Self {
        self.tokens = tokens;
        self
    }

    /// Add one metadata entry
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A recorded generation attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Position in the ledger, starting at 1
    pub sequence: u64,
    /// When the call was recorded
    pub timestamp: DateTime<Utc>,
    /// Billing provider
    pub platform: String,
    /// Model identifier
    pub model: String,
    /// Panel or asset id
    pub work_item_id: String,
    /// Pipeline phase
    pub phase: Option<String>,
    /// Scene label
    pub scene_id: Option<String>,
    /// Charged cost; zero unless `status` is success
    pub cost_usd: f64,
    /// Wall time of the attempt
    pub generation_duration_ms: u64,
    /// Output size
    pub dimensions: ImageDimensions,
    /// `width * height / 1e6`
    pub megapixels: f64,
    /// 1K / 2K / 4K class
    pub resolution: String,
    /// Priced as batch
    pub is_batch: bool,
    /// Outcome
    pub status: CallStatus,
    /// Failure description, only for non-success calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider token usage
    pub tokens: TokenUsage,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl CallRecord {
    /// Phase label used for aggregation
    pub fn phase_bucket(&self) -> &str {
        self.phase
            .as_deref()
            .unwrap_or(super::aggregate::UNSPECIFIED_PHASE)
    }
}
