// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dpx configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! [runtime]
//! java = "/usr/lib/jvm/java-8/bin/java"
//! probe_timeout_secs = 30
//!
//! [engine]
//! use_dpa = true
//! max_device_threads = 4
//!
//! [partition]
//! count = 32
//!
//! [[mappings]]
//! interface = "java.util.List<pkg.Image>"
//! concrete = "java.util.ArrayList<pkg.Image>"
//!
//! [[classes]]
//! name = "pkg.Image"
//! fields = [{ name = "uri", type = "java.lang.String" }]
//! ```

use crate::error::{Error, Result};
use crate::layout::{RuntimeLayoutProbe, RuntimeSizing};
use crate::types::{ClassSpec, InterfaceBinding, InterfaceMapping, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DpxConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub engine: EngineOptions,

    #[serde(default)]
    pub partition: PartitionConfig,

    /// Interface -> concrete substitutes for schema discovery.
    #[serde(default)]
    pub mappings: Vec<InterfaceBinding>,

    /// Class descriptions added on top of the built-ins.
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
}

impl DpxConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.runtime.validate()?;
        self.engine.validate()?;
        if self.partition.count == 0 {
            return Err(Error::Configuration(
                "partition.count must be positive".into(),
            ));
        }
        self.mapping()?;
        self.registry()?;
        Ok(())
    }

    /// Built-in classes plus every `[[classes]]` entry.
    pub fn registry(&self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::with_builtins();
        registry.define_all(&self.classes)?;
        Ok(registry)
    }

    pub fn mapping(&self) -> Result<InterfaceMapping> {
        InterfaceMapping::from_bindings(self.mappings.iter().cloned())
    }

    /// Layout probe for the configured runtime.
    pub fn probe(&self) -> RuntimeLayoutProbe {
        RuntimeLayoutProbe::new(&self.runtime.java).with_timeout(self.runtime.probe_timeout())
    }
}

impl FromStr for DpxConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Verification runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime launcher used for probing.
    #[serde(default = "default_java")]
    pub java: String,

    /// Upper bound on one probe run (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Explicit sizing. When absent it is read from the runtime's flags.
    #[serde(default)]
    pub sizing: Option<RuntimeSizing>,
}

fn default_java() -> String {
    "java".to_string()
}

fn default_probe_timeout() -> u64 {
    30
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            java: default_java(),
            probe_timeout_secs: default_probe_timeout(),
            sizing: None,
        }
    }
}

impl RuntimeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.java.trim().is_empty() {
            return Err(Error::Configuration("runtime.java is empty".into()));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::Configuration(
                "runtime.probe_timeout_secs must be positive".into(),
            ));
        }
        if let Some(sizing) = &self.sizing {
            sizing.validate()?;
        }
        Ok(())
    }
}

/// Options handed to the offload engine at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Use direct processor access on the device.
    #[serde(default = "default_true")]
    pub use_dpa: bool,

    /// Transcode UTF-16 string payloads to UTF-8 on the device.
    #[serde(default)]
    pub enable_utf16_to_utf8: bool,

    /// Per-class layout descriptor budget (bytes).
    #[serde(default = "default_max_class_info_size")]
    pub max_class_info_size: u64,

    /// Per-task context buffer (bytes).
    #[serde(default = "default_max_task_ctx_buffer_size")]
    pub max_task_ctx_buffer_size: u64,

    /// Per-task output buffer (bytes).
    #[serde(default = "default_max_task_out_buffer_size")]
    pub max_task_out_buffer_size: u64,

    #[serde(default = "default_max_device_threads")]
    pub max_device_threads: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_class_info_size() -> u64 {
    16 * 1024
}

fn default_max_task_ctx_buffer_size() -> u64 {
    128 * 1024
}

fn default_max_task_out_buffer_size() -> u64 {
    16 * 1024
}

fn default_max_device_threads() -> u32 {
    1
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            use_dpa: true,
            enable_utf16_to_utf8: false,
            max_class_info_size: default_max_class_info_size(),
            max_task_ctx_buffer_size: default_max_task_ctx_buffer_size(),
            max_task_out_buffer_size: default_max_task_out_buffer_size(),
            max_device_threads: default_max_device_threads(),
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("max_class_info_size", self.max_class_info_size),
            ("max_task_ctx_buffer_size", self.max_task_ctx_buffer_size),
            ("max_task_out_buffer_size", self.max_task_out_buffer_size),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::Configuration(format!(
                    "engine.{} must be positive",
                    name
                )));
            }
        }
        if self.max_device_threads == 0 {
            return Err(Error::Configuration(
                "engine.max_device_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Partitioning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default = "default_partition_count")]
    pub count: usize,
}

fn default_partition_count() -> usize {
    32
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            count: default_partition_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: DpxConfig = "".parse().unwrap();
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert_eq!(config.runtime.probe_timeout(), Duration::from_secs(30));
        assert_eq!(config.engine, EngineOptions::default());
        assert_eq!(config.engine.max_task_ctx_buffer_size, 128 * 1024);
        assert_eq!(config.partition.count, 32);
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config: DpxConfig = r#"
            [runtime]
            java = "/opt/jdk8/bin/java"
            probe_timeout_secs = 5

            [runtime.sizing]
            heap_min_size = 1073741824
            heap_max_size = 1073741824
            heap_base = 34359738368
            metaspace_size = 67108864
            max_metaspace_size = 268435456
            compressed_class_space_size = 134217728

            [engine]
            enable_utf16_to_utf8 = true
            max_device_threads = 8

            [partition]
            count = 4

            [[mappings]]
            interface = "java.util.List<pkg.Image>"
            concrete = "java.util.ArrayList<pkg.Image>"

            [[classes]]
            name = "pkg.Image"
            fields = [{ name = "uri", type = "java.lang.String" }]
        "#
        .parse()
        .unwrap();

        assert_eq!(config.runtime.sizing.unwrap().heap_base, 32 << 30);
        assert!(config.engine.use_dpa);
        assert!(config.engine.enable_utf16_to_utf8);
        assert_eq!(config.engine.max_device_threads, 8);
        assert_eq!(config.partition.count, 4);
        assert_eq!(config.mapping().unwrap().len(), 1);
        assert!(config.registry().unwrap().get("pkg.Image").is_some());
        assert_eq!(config.probe().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for text in [
            "[partition]\ncount = 0\n",
            "[engine]\nmax_device_threads = 0\n",
            "[engine]\nmax_class_info_size = 0\n",
            "[runtime]\njava = \"\"\n",
            "[runtime]\nprobe_timeout_secs = 0\n",
            "[[mappings]]\ninterface = \"pkg.I\"\nconcrete = \"pkg.I\"\n",
            "[[classes]]\nname = \"pkg.E\"\nvariants = [\"A\"]\n",
        ] {
            assert!(
                matches!(text.parse::<DpxConfig>(), Err(Error::Configuration(_))),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_bad_toml_is_toml_error() {
        assert!(matches!("[runtime".parse::<DpxConfig>(), Err(Error::Toml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[partition]\ncount = 7").unwrap();
        let config = DpxConfig::from_file(file.path()).unwrap();
        assert_eq!(config.partition.count, 7);
    }
}
