//! Per-phase config files (§6): `target.cnf`, `impactor.cnf`, `stab.cnf`,
//! `geometry.cnf`, `frag.cnf`, `reac.cnf`, each a flat `key = value` text
//! file. On first run a file is absent, so a default is written and the run
//! is reported to the caller as a dry run; a file already on disk means a
//! real run using its values. Parameter structs themselves derive
//! `serde::{Serialize, Deserialize}` (kept for any future structured
//! interchange), but this flat format is hand-rolled rather than YAML —
//! the ambient config story the teacher's `serde_yaml` usage grounds, but
//! `.cnf`'s literal shape doesn't match YAML's.

use std::path::Path;

use crate::error::{IoError, IoResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered flat enumeration of (key, typed value) pairs — the
/// "identifier table" §6 describes. Order is preserved so a written file
/// reads predictably and round-trips byte-for-byte given the same values.
#[derive(Debug, Default, Clone)]
pub struct ConfigFile {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) -> &mut Self {
        self.entries.push((key.into(), value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(ConfigValue::Float(v)) => Some(*v),
            Some(ConfigValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(String, ConfigValue)] {
        &self.entries
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let tag = match value {
                ConfigValue::Float(_) => "float",
                ConfigValue::Int(_) => "int",
                ConfigValue::Bool(_) => "bool",
                ConfigValue::Text(_) => "text",
            };
            out.push_str(&format!("{key} = {tag}:{value}\n"));
        }
        out
    }

    fn parse(text: &str, path: &Path) -> IoResult<Self> {
        let mut entries = Vec::new();
        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, rest) = line.split_once('=').ok_or_else(|| IoError::MalformedConfig {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: "expected `key = type:value`".to_string(),
            })?;
            let (tag, raw_value) = rest.trim().split_once(':').ok_or_else(|| IoError::MalformedConfig {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: "expected a `type:value` tagged value".to_string(),
            })?;
            let value = match tag {
                "float" => ConfigValue::Float(raw_value.parse().map_err(|_| IoError::MalformedConfig {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("'{raw_value}' is not a float"),
                })?),
                "int" => ConfigValue::Int(raw_value.parse().map_err(|_| IoError::MalformedConfig {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("'{raw_value}' is not an int"),
                })?),
                "bool" => ConfigValue::Bool(raw_value.parse().map_err(|_| IoError::MalformedConfig {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("'{raw_value}' is not a bool"),
                })?),
                "text" => ConfigValue::Text(raw_value.to_string()),
                other => {
                    return Err(IoError::MalformedConfig {
                        path: path.to_path_buf(),
                        line: line_no + 1,
                        message: format!("unknown value tag '{other}'"),
                    })
                }
            };
            entries.push((key.trim().to_string(), value));
        }
        Ok(ConfigFile { entries })
    }
}

/// Whether `load_or_write_default` found an existing file (real run) or had
/// to write one out (dry run, reported back to the caller per §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Real,
    Dry,
}

/// Reads `path` if present; otherwise writes `default()` to `path` and
/// reports a dry run.
pub fn load_or_write_default(
    path: &Path,
    default: impl FnOnce() -> ConfigFile,
) -> IoResult<(ConfigFile, RunKind)> {
    if path.exists() {
        let text = std::fs::read_to_string(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((ConfigFile::parse(&text, path)?, RunKind::Real))
    } else {
        let config = default();
        std::fs::write(path, config.render()).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((config, RunKind::Dry))
    }
}

/// The fixed set of per-phase config file names (§6).
pub const PHASE_CONFIG_NAMES: [&str; 6] = [
    "target.cnf",
    "impactor.cnf",
    "stab.cnf",
    "geometry.cnf",
    "frag.cnf",
    "reac.cnf",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_then_parse_round_trips_typed_values() {
        let mut config = ConfigFile::new();
        config
            .set("radius", ConfigValue::Float(50_000.0))
            .set("particle_count", ConfigValue::Int(10_000))
            .set("use_damage", ConfigValue::Bool(true))
            .set("eos", ConfigValue::Text("tillotson".to_string()));

        let rendered = config.render();
        let parsed = ConfigFile::parse(&rendered, Path::new("<mem>")).unwrap();
        assert_eq!(parsed.get_float("radius"), Some(50_000.0));
        assert_eq!(parsed.get("use_damage"), Some(&ConfigValue::Bool(true)));
        assert_eq!(parsed.get("eos"), Some(&ConfigValue::Text("tillotson".to_string())));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = ConfigFile::parse("radius = float:50\nnonsense line\n", Path::new("<mem>")).unwrap_err();
        match err {
            IoError::MalformedConfig { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedConfig, got {other:?}"),
        }
    }
}
