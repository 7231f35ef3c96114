//! Prediction-set artifact: a verified CBOR container.
//!
//! Layout: a CBOR-encoded [`ArtifactHeader`] immediately followed by the
//! CBOR-encoded [`PredictionSet`]. The header carries the magic, the format
//! version, the body length, and SHA-256 digests of the body and of the header
//! fields themselves. Reading checks all of them before decoding the body.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ranker::PredictionRecord;

// ============================================================================
// Header
// ============================================================================

/// "KGBP"
pub const MAGIC: [u8; 4] = [0x4B, 0x47, 0x42, 0x50];

/// Packed `major << 24 | minor << 16 | patch`.
pub const VERSION: u32 = 0x01_00_00_00;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub content_length: u64,
    pub content_checksum: [u8; 32],
    pub header_checksum: [u8; 32],
}

impl ArtifactHeader {
    pub fn new(content: &[u8]) -> Self {
        let mut header = Self {
            magic: MAGIC,
            version: VERSION,
            content_length: content.len() as u64,
            content_checksum: sha256(content),
            header_checksum: [0u8; 32],
        };
        header.header_checksum = header.compute_header_checksum();
        header
    }

    fn compute_header_checksum(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.magic);
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.content_length.to_le_bytes());
        hasher.update(self.content_checksum);
        hasher.finalize().into()
    }

    pub fn verify(&self) -> Result<(), ArtifactError> {
        if self.magic != MAGIC {
            return Err(ArtifactError::InvalidMagic);
        }
        if !is_version_compatible(self.version, VERSION) {
            return Err(ArtifactError::IncompatibleVersion {
                file_version: self.version,
                reader_version: VERSION,
            });
        }
        if self.header_checksum != self.compute_header_checksum() {
            return Err(ArtifactError::HeaderChecksumMismatch);
        }
        Ok(())
    }

    pub fn verify_content(&self, content: &[u8]) -> Result<(), ArtifactError> {
        if content.len() as u64 != self.content_length {
            return Err(ArtifactError::ContentLengthMismatch {
                expected: self.content_length,
                actual: content.len() as u64,
            });
        }
        if sha256(content) != self.content_checksum {
            return Err(ArtifactError::ContentChecksumMismatch);
        }
        Ok(())
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Same major; reader minor at least the file's.
fn is_version_compatible(file_version: u32, reader_version: u32) -> bool {
    let major = |v: u32| (v >> 24) & 0xFF;
    let minor = |v: u32| (v >> 16) & 0xFF;
    major(file_version) == major(reader_version) && minor(reader_version) >= minor(file_version)
}

// ============================================================================
// Body
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub model: String,
    pub k: usize,
    pub created_at_unix_secs: u64,
    pub records: Vec<PredictionRecord>,
}

impl PredictionSet {
    pub fn new(model: impl Into<String>, k: usize, records: Vec<PredictionRecord>) -> Self {
        let created_at_unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            model: model.into(),
            k,
            created_at_unix_secs,
            records,
        }
    }
}

pub fn encode_prediction_set(set: &PredictionSet) -> Result<Vec<u8>, ArtifactError> {
    let mut content = Vec::new();
    ciborium::into_writer(set, &mut content)
        .map_err(|e| ArtifactError::Serialization(e.to_string()))?;

    let header = ArtifactHeader::new(&content);
    let mut out = Vec::with_capacity(content.len() + 128);
    ciborium::into_writer(&header, &mut out)
        .map_err(|e| ArtifactError::Serialization(e.to_string()))?;
    out.extend_from_slice(&content);
    Ok(out)
}

pub fn decode_prediction_set(data: &[u8]) -> Result<PredictionSet, ArtifactError> {
    let mut cursor = Cursor::new(data);
    let header: ArtifactHeader = ciborium::from_reader(&mut cursor)
        .map_err(|e| ArtifactError::Deserialization(e.to_string()))?;
    header.verify()?;

    let pos = usize::try_from(cursor.position()).unwrap_or(data.len());
    let content = data.get(pos..).unwrap_or(&[]);
    header.verify_content(content)?;

    ciborium::from_reader(content).map_err(|e| ArtifactError::Deserialization(e.to_string()))
}

pub fn write_prediction_set(path: &Path, set: &PredictionSet) -> Result<(), ArtifactError> {
    let bytes = encode_prediction_set(set)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        model = %set.model,
        records = set.records.len(),
        bytes = bytes.len(),
        "wrote prediction set"
    );
    Ok(())
}

pub fn read_prediction_set(path: &Path) -> Result<PredictionSet, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let set = decode_prediction_set(&bytes).map_err(|e| e.at(path))?;
    tracing::debug!(path = %path.display(), records = set.records.len(), "read prediction set");
    Ok(set)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid magic bytes (not a prediction set)")]
    InvalidMagic,

    #[error("incompatible version: file {file_version:#x}, reader {reader_version:#x}")]
    IncompatibleVersion { file_version: u32, reader_version: u32 },

    #[error("header checksum mismatch")]
    HeaderChecksumMismatch,

    #[error("content length mismatch: expected {expected}, got {actual}")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    #[error("content checksum mismatch")]
    ContentChecksumMismatch,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("cannot access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}`: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ArtifactError>,
    },
}

impl ArtifactError {
    fn at(self, path: &Path) -> Self {
        ArtifactError::InFile {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}
