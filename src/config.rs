// src/config.rs

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

use crate::error::{Error, Result};
use crate::ingest::Encoding;
use crate::sink::WriteMode;

pub const DEFAULT_PACKAGE_URL: &str =
    "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3/action/package_show";
pub const DEFAULT_PACKAGE_ID: &str = "bike-share-toronto-ridership-data";
pub const DEFAULT_STATION_INFO_URL: &str =
    "https://tor.publicbikesystem.net/ube/gbfs/v1/en/station_information";

/// Run configuration. Every field has a default so an empty YAML document
/// (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Where archives are unpacked and downloads are staged.
    pub output_dir: PathBuf,
    /// Regexes matched (case-insensitively) against file names; a match skips the file.
    pub skip_patterns: Vec<String>,
    /// Decode chain for delimited files, tried in order.
    pub encodings: Vec<Encoding>,
    /// Worker pool size; 0 uses one worker per CPU.
    pub workers: usize,
    /// Only resources whose name matches one of these are fetched. Empty accepts all.
    pub required_files: Vec<String>,
    /// canonical field → additional historical column names.
    pub extra_aliases: BTreeMap<String, Vec<String>>,
    pub sink: SinkConfig,
    pub package_url: String,
    pub package_id: String,
    /// GBFS `station_information` feed saved alongside a fetch.
    pub station_info_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub dir: PathBuf,
    pub table: String,
    pub mode: WriteMode,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("warehouse"),
            table: "ridership_data".into(),
            mode: WriteMode::Replace,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("imported_data"),
            skip_patterns: vec![
                r"(^|/)readme".into(),
                r"(^|/)__macosx/".into(),
                r"(^|/)\._".into(),
            ],
            encodings: vec![Encoding::Utf8, Encoding::Latin1],
            workers: 0,
            required_files: Vec::new(),
            extra_aliases: BTreeMap::new(),
            sink: SinkConfig::default(),
            package_url: DEFAULT_PACKAGE_URL.into(),
            package_id: DEFAULT_PACKAGE_ID.into(),
            station_info_url: DEFAULT_STATION_INFO_URL.into(),
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file, falling back to defaults for anything omitted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))?
        };
        cfg.check()?;
        Ok(cfg)
    }

    fn check(&self) -> Result<()> {
        if self.encodings.is_empty() {
            return Err(Error::Config("encodings must name at least one encoding".into()));
        }
        self.skip_list()?;
        compile_patterns(&self.required_files)?;
        Ok(())
    }

    pub fn skip_list(&self) -> Result<SkipList> {
        Ok(SkipList {
            patterns: compile_patterns(&self.skip_patterns)?,
        })
    }

    pub fn required_patterns(&self) -> Result<Vec<Regex>> {
        compile_patterns(&self.required_files)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config(format!("bad pattern `{}`: {}", p, e)))
        })
        .collect()
}

/// Files excluded before any parsing attempt.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    patterns: Vec<Regex>,
}

impl SkipList {
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&name))
    }
}
