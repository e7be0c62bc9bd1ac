use serde::{Deserialize, Serialize};

/// Size of one memory cell in bytes. Every address names one such word.
pub const WORD_BYTES: u64 = 8;
/// Largest supported cache line.
pub const MAX_LINE_BYTES: u64 = 1024;

/// Raw simulator configuration as supplied by the user.
///
/// The same cache geometry is used for both the instruction and data caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub memory_bytes: u64,
    pub line_bytes: u64,
    pub lines_per_set: u64,
    pub sets: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_bytes: 256,
            line_bytes: 16,
            lines_per_set: 2,
            sets: 2,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} = {value} is not a multiple of 8")]
    NotWordMultiple { field: &'static str, value: u64 },
    #[error("line_bytes = {0} exceeds 1024")]
    LineTooLarge(u64),
    #[error("memory_bytes = {memory} must be larger than the cache ({cache} bytes)")]
    MemoryTooSmall { memory: u64, cache: u64 },
    #[error("config line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("invalid JSON config: {0}")]
    Json(String),
}

/// Validated cache geometry plus memory size, expressed in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub words_per_line: u64,
    pub lines_per_set: u64,
    pub sets: u64,
    pub memory_words: u64,
}

impl SimConfig {
    pub fn validate(&self) -> Result<Geometry, ConfigError> {
        for (field, value) in [
            ("memory_bytes", self.memory_bytes),
            ("line_bytes", self.line_bytes),
            ("lines_per_set", self.lines_per_set),
            ("sets", self.sets),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }
        if self.line_bytes % WORD_BYTES != 0 {
            return Err(ConfigError::NotWordMultiple {
                field: "line_bytes",
                value: self.line_bytes,
            });
        }
        if self.line_bytes > MAX_LINE_BYTES {
            return Err(ConfigError::LineTooLarge(self.line_bytes));
        }
        if self.memory_bytes % WORD_BYTES != 0 {
            return Err(ConfigError::NotWordMultiple {
                field: "memory_bytes",
                value: self.memory_bytes,
            });
        }
        let cache = self
            .line_bytes
            .saturating_mul(self.lines_per_set)
            .saturating_mul(self.sets);
        if self.memory_bytes <= cache {
            return Err(ConfigError::MemoryTooSmall {
                memory: self.memory_bytes,
                cache,
            });
        }
        Ok(Geometry {
            words_per_line: self.line_bytes / WORD_BYTES,
            lines_per_set: self.lines_per_set,
            sets: self.sets,
            memory_words: self.memory_bytes / WORD_BYTES,
        })
    }

    /// Parse the `key = value` configuration file format.
    ///
    /// `#` starts a comment. Keys that are absent keep their default value.
    pub fn from_kv_str(text: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let s = match raw.find('#') {
                Some(p) => &raw[..p],
                None => raw,
            }
            .trim();
            if s.is_empty() {
                continue;
            }
            let (key, value) = s.split_once('=').ok_or_else(|| ConfigError::Parse {
                line,
                msg: format!("expected `key = value`, got `{s}`"),
            })?;
            let value: u64 = value.trim().parse().map_err(|_| ConfigError::Parse {
                line,
                msg: format!("`{}` is not a non-negative integer", value.trim()),
            })?;
            match key.trim() {
                "memory_bytes" => cfg.memory_bytes = value,
                "line_bytes" => cfg.line_bytes = value,
                "lines_per_set" => cfg.lines_per_set = value,
                "sets" => cfg.sets = value,
                other => {
                    return Err(ConfigError::Parse {
                        line,
                        msg: format!("unknown key `{other}`"),
                    })
                }
            }
        }
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Bytes held by one cache (instruction or data).
    pub fn cache_bytes(&self) -> u64 {
        self.line_bytes
            .saturating_mul(self.lines_per_set)
            .saturating_mul(self.sets)
    }
}
