use crate::error::{Result, VectorStoreError};
use crate::paths::model_dir;
use async_trait::async_trait;
use ndarray::{Array, Axis, Ix2, Ix3};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;
use treegpt_text_chunker::{HfTokenCounter, TokenCounter, WhitespaceTokenCounter};

pub const DEFAULT_MODEL_ID: &str = "all-minilm-l6-v2";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// ONNX Runtime inference on a local sentence-transformer export
    Fast,
    /// Deterministic hash vectors, no model files needed
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        let raw = env::var("TREEGPT_EMBEDDING_MODE").unwrap_or_else(|_| "fast".to_string());
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::embedding(format!(
                "Unsupported TREEGPT_EMBEDDING_MODE '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Stub => "stub",
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ModelSpec {
    id: &'static str,
    dimension: usize,
    max_length: usize,
    max_batch: usize,
}

const MODEL_SPECS: &[ModelSpec] = &[
    ModelSpec {
        id: "all-minilm-l6-v2",
        dimension: 384,
        max_length: 256,
        max_batch: 32,
    },
    ModelSpec {
        id: "all-mpnet-base-v2",
        dimension: 768,
        max_length: 384,
        max_batch: 16,
    },
    ModelSpec {
        id: "bge-small",
        dimension: 384,
        max_length: 512,
        max_batch: 32,
    },
];

impl ModelSpec {
    fn lookup(raw: &str) -> Result<Self> {
        let id = normalize_model_id(raw);
        MODEL_SPECS
            .iter()
            .find(|spec| spec.id == id)
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = MODEL_SPECS.iter().map(|spec| spec.id).collect();
                VectorStoreError::embedding(format!(
                    "Unknown embedding model '{id}' (known: {})",
                    known.join(", ")
                ))
            })
    }

    /// Accepts `model.onnx` at the top of the model folder or under `onnx/`.
    fn assets_in(&self, model_dir: &Path) -> (PathBuf, PathBuf) {
        let root = model_dir.join(self.id);
        let flat = root.join("model.onnx");
        let model_path = if flat.exists() {
            flat
        } else {
            root.join("onnx").join("model.onnx")
        };
        (model_path, root.join("tokenizer.json"))
    }
}

fn normalize_model_id(raw: &str) -> String {
    let id = raw.trim().to_ascii_lowercase();
    let id = id.strip_prefix("sentence-transformers/").unwrap_or(&id);
    match id {
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => "bge-small".to_string(),
        other => other.to_string(),
    }
}

/// Model id selected by `TREEGPT_EMBEDDING_MODEL`, normalized.
#[must_use]
pub fn current_model_id() -> String {
    let raw = env::var("TREEGPT_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
    normalize_model_id(&raw)
}

/// Text to fixed-length vector. Every call with the same text yields the same vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(vec![text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::embedding("Empty embedding result"))
    }
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_batch: usize,
    dimension: usize,
}

static BACKENDS: OnceCell<Mutex<HashMap<PathBuf, Arc<OrtBackend>>>> = OnceCell::new();

impl OrtBackend {
    fn load_cached(spec: &ModelSpec, model_dir: &Path) -> Result<Arc<Self>> {
        let cache = BACKENDS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = cache
            .lock()
            .map_err(|_| VectorStoreError::embedding("Failed to lock backend cache"))?;
        let key = model_dir.join(spec.id);
        if let Some(backend) = guard.get(&key) {
            return Ok(backend.clone());
        }
        let backend = Arc::new(Self::new(spec, model_dir)?);
        guard.insert(key, backend.clone());
        Ok(backend)
    }

    fn new(spec: &ModelSpec, model_dir: &Path) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        let (model_path, tokenizer_path) = spec.assets_in(model_dir);
        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(VectorStoreError::embedding(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {}. Set TREEGPT_MODEL_DIR or use TREEGPT_EMBEDDING_MODE=stub.",
                spec.id,
                model_path.display(),
                tokenizer_path.display(),
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| VectorStoreError::embedding(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| VectorStoreError::embedding(format!("Tokenizer truncation failed: {e}")))?;

        let session = Session::builder()
            .map_err(|e| VectorStoreError::embedding(format!("{e}")))?
            .with_intra_threads(default_intra_threads())
            .map_err(|e| {
                VectorStoreError::embedding(format!("Failed to set ORT intra threads: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                VectorStoreError::embedding(format!("Failed to set optimization level: {e}"))
            })?
            .commit_from_file(&model_path)
            .map_err(|e| VectorStoreError::embedding(format!("Failed to load ONNX model: {e}")))?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, batch {})",
            spec.id,
            spec.dimension,
            spec.max_length,
            spec.max_batch
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_batch: spec.max_batch,
            dimension: spec.dimension,
        })
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| VectorStoreError::embedding(format!("Tokenization failed: {e}")))?;
            let Some(seq_len) = encodings.first().map(Encoding::len) else {
                continue;
            };
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::embedding(
                    "Inconsistent sequence lengths after padding",
                ));
            }

            let (ids, masks, type_ids, mask_rows) = flatten_encodings(&encodings, seq_len);
            let shape = (batch.len(), seq_len);
            let mut available: HashMap<&'static str, DynTensor> = HashMap::new();
            available.insert("input_ids", i64_tensor(shape, ids)?);
            available.insert("attention_mask", i64_tensor(shape, masks)?);
            available.insert("token_type_ids", i64_tensor(shape, type_ids)?);

            let array = {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| VectorStoreError::embedding("Failed to lock ONNX session"))?;

                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let value = available.remove(input.name.as_str()).ok_or_else(|| {
                        VectorStoreError::embedding(format!(
                            "Unsupported ONNX input '{}'",
                            input.name
                        ))
                    })?;
                    feed.insert(input.name.clone(), value);
                }

                let outputs = session
                    .run(SessionInputs::from(feed))
                    .map_err(|e| VectorStoreError::embedding(format!("ONNX forward failed: {e}")))?;
                if outputs.len() == 0 {
                    return Err(VectorStoreError::embedding("ONNX returned no outputs"));
                }
                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        VectorStoreError::embedding(format!("Failed to decode ONNX output: {e}"))
                    })?
                    .to_owned();
                drop(outputs);
                drop(session);
                array
            };
            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }
        Ok(results)
    }
}

fn default_intra_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus / 4).clamp(1, 4)
}

fn i64_tensor(shape: (usize, usize), data: Vec<i64>) -> Result<DynTensor> {
    let array = Array::from_shape_vec(shape, data)
        .map_err(|e| VectorStoreError::embedding(format!("Tensor shape error: {e}")))?;
    Ok(Tensor::from_array(array.into_dyn())
        .map_err(|e| VectorStoreError::embedding(format!("{e}")))?
        .upcast())
}

type FlatTensors = (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>);

fn flatten_encodings(encodings: &[Encoding], seq_len: usize) -> FlatTensors {
    let capacity = encodings.len() * seq_len;
    let mut ids = Vec::with_capacity(capacity);
    let mut masks = Vec::with_capacity(capacity);
    let mut type_ids = Vec::with_capacity(capacity);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let row: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .take(seq_len)
            .map(|v| i64::from(*v))
            .collect();
        ids.extend(encoding.get_ids().iter().take(seq_len).map(|v| i64::from(*v)));
        type_ids.extend(
            encoding
                .get_type_ids()
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v)),
        );
        masks.extend(row.iter().copied());
        mask_rows.push(row);
    }

    (ids, masks, type_ids, mask_rows)
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        // Already pooled: [batch, dim]
        2 => {
            let pooled = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| VectorStoreError::embedding(format!("Bad output shape: {e}")))?;
            for row in pooled.outer_iter() {
                out.push(finish_vector(row.to_vec(), dimension)?);
            }
        }
        // Token states: [batch, seq, dim]
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::embedding(format!("Bad output shape: {e}")))?;
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let mask = mask_rows.get(idx).map_or(&[][..], Vec::as_slice);
                out.push(finish_vector(mean_pool(sample, mask), dimension)?);
            }
        }
        _ => {
            return Err(VectorStoreError::embedding(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

fn finish_vector(mut vec: Vec<f32>, dimension: usize) -> Result<Vec<f32>> {
    if vec.len() != dimension {
        return Err(VectorStoreError::InvalidDimension {
            expected: dimension,
            actual: vec.len(),
        });
    }
    normalize(&mut vec);
    Ok(vec)
}

/// Average of the token states the attention mask keeps.
fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    let mut sum = vec![0.0f32; sample.len_of(Axis(1))];
    let mut count = 0.0f32;
    for (token_idx, token) in sample.outer_iter().enumerate() {
        if mask.get(token_idx).copied().unwrap_or(0) == 0 {
            continue;
        }
        count += 1.0;
        for (acc, value) in sum.iter_mut().zip(token.iter()) {
            *acc += value;
        }
    }
    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec: Vec<f32> = (0..dimension)
        .map(|_| {
            let mantissa = ((splitmix64(&mut state) >> 32) as u32) >> 9;
            let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
            unit.mul_add(2.0, -1.0)
        })
        .collect();
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Sentence embedding model backed by ONNX Runtime or by the stub hasher
pub struct EmbeddingModel {
    backend: EmbeddingBackend,
    model_id: String,
    dimension: usize,
}

enum EmbeddingBackend {
    Ort(Arc<OrtBackend>),
    Stub,
}

impl EmbeddingModel {
    /// Mode, model and model directory from `TREEGPT_*` variables.
    pub fn new() -> Result<Self> {
        let mode = EmbeddingMode::from_env()?;
        Self::with_options(mode, &current_model_id(), &model_dir())
    }

    pub fn with_options(mode: EmbeddingMode, model_id: &str, model_dir: &Path) -> Result<Self> {
        let spec = ModelSpec::lookup(model_id)?;
        let backend = match mode {
            EmbeddingMode::Stub => {
                log::debug!("Using stub embeddings for '{}'", spec.id);
                EmbeddingBackend::Stub
            }
            EmbeddingMode::Fast => EmbeddingBackend::Ort(OrtBackend::load_cached(&spec, model_dir)?),
        };
        Ok(Self {
            backend,
            model_id: spec.id.to_string(),
            dimension: spec.dimension,
        })
    }

    /// Stub model of an arbitrary dimension.
    #[must_use]
    pub fn stub(dimension: usize) -> Self {
        Self {
            backend: EmbeddingBackend::Stub,
            model_id: "stub".to_string(),
            dimension,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> EmbeddingMode {
        match self.backend {
            EmbeddingBackend::Ort(_) => EmbeddingMode::Fast,
            EmbeddingBackend::Stub => EmbeddingMode::Stub,
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Token counter matching this model's tokenizer. Stub mode counts words.
    pub fn token_counter(&self) -> Result<Arc<dyn TokenCounter>> {
        match &self.backend {
            EmbeddingBackend::Ort(backend) => Ok(Arc::new(HfTokenCounter::from_tokenizer(
                backend.tokenizer.clone(),
            )?)),
            EmbeddingBackend::Stub => Ok(Arc::new(WhitespaceTokenCounter)),
        }
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        match &self.backend {
            EmbeddingBackend::Stub => Ok(texts
                .iter()
                .map(|text| stub_embed(text, self.dimension))
                .collect()),
            EmbeddingBackend::Ort(backend) => {
                let backend = backend.clone();
                let owned: Vec<String> = texts.into_iter().map(ToString::to_string).collect();
                spawn_blocking(move || backend.embed_batch_blocking(&owned))
                    .await
                    .map_err(|e| VectorStoreError::embedding(format!("Join error: {e}")))?
            }
        }
    }
}
