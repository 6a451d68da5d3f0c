// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Effective runtime flags from `-XX:+PrintFlagsFinal`.
//!
//! ```text
//! [Global flags]
//!     uintx InitialHeapSize                          := 264241152       {product}
//!      bool UseCompressedOops                        := true            {lp64_product}
//!     ccstr AbortVMOnException                        =                 {diagnostic}
//! ```

use super::contract::RuntimeSizing;
use super::probe::{run_capture, DEFAULT_PROBE_TIMEOUT};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Name -> value table of the runtime's final flag values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    values: HashMap<String, String>,
}

impl RuntimeFlags {
    /// Ask `java` for its effective flags.
    pub fn query(java: &Path) -> Result<Self> {
        Self::query_with_timeout(java, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn query_with_timeout(java: &Path, timeout: Duration) -> Result<Self> {
        let args = ["-XX:+PrintFlagsFinal".to_string(), "-version".to_string()];
        let text = run_capture(java, &args, timeout, |mut stdout| {
            let mut text = String::new();
            stdout
                .read_to_string(&mut text)
                .map_err(|e| Error::ProbeFailed(format!("reading flags: {}", e)))?;
            Ok(text)
        })?;
        let flags = Self::parse(&text);
        if flags.is_empty() {
            return Err(Error::ProbeFailed(
                "runtime printed no flag values".into(),
            ));
        }
        log::debug!("[probe] read {} runtime flags", flags.len());
        Ok(flags)
    }

    /// Parse `PrintFlagsFinal` output. Lines that are not flag entries are
    /// ignored.
    pub fn parse(text: &str) -> Self {
        let values = text.lines().filter_map(parse_line).collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn get_u64(&self, name: &str) -> Result<u64> {
        let raw = self.require(name)?;
        raw.parse()
            .map_err(|_| Error::ProbeFailed(format!("flag `{}` is not an integer: `{}`", name, raw)))
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            "true" => Ok(true),
            "false" => Ok(false),
            raw => Err(Error::ProbeFailed(format!(
                "flag `{}` is not a boolean: `{}`",
                name, raw
            ))),
        }
    }

    fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::ProbeFailed(format!("runtime flag `{}` not reported", name)))
    }

    /// Sizing currently in effect on the runtime.
    pub fn sizing(&self) -> Result<RuntimeSizing> {
        Ok(RuntimeSizing {
            heap_min_size: self.get_u64("InitialHeapSize")?,
            heap_max_size: self.get_u64("MaxHeapSize")?,
            heap_base: self.get_u64("HeapBaseMinAddress")?,
            metaspace_size: self.get_u64("MetaspaceSize")?,
            max_metaspace_size: self.get_u64("MaxMetaspaceSize")?,
            compressed_class_space_size: self.get_u64("CompressedClassSpaceSize")?,
        })
    }

    /// Whether both compressed oops and compressed class pointers are on.
    pub fn uses_compressed_pointers(&self) -> Result<bool> {
        Ok(self.get_bool("UseCompressedOops")? && self.get_bool("UseCompressedClassPointers")?)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `<type> <Name> = <value> {<origin>}`, with `:=` for non-default values.
fn parse_line(line: &str) -> Option<(String, String)> {
    let mut tokens = line.split_whitespace();
    let _ty = tokens.next()?;
    let name = tokens.next()?;
    match tokens.next()? {
        "=" | ":=" => {}
        _ => return None,
    }
    let value = match tokens.next() {
        Some(v) if !v.starts_with('{') => v,
        _ => "",
    };
    Some((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[Global flags]
     bool UseCompressedClassPointers               := true                                {lp64_product}
     bool UseCompressedOops                        := true                                {lp64_product}
    uintx InitialHeapSize                          := 268435456                           {product}
    uintx MaxHeapSize                              := 4294967296                          {product}
    uintx HeapBaseMinAddress                        = 2147483648                          {pd product}
    uintx MetaspaceSize                             = 21807104                            {pd product}
    uintx MaxMetaspaceSize                          = 18446744073709547520                {product}
    uintx CompressedClassSpaceSize                  = 1073741824                          {product}
    ccstr AbortVMOnException                        =                                     {diagnostic}
openjdk version \"1.8.0_392\"
";

    #[test]
    fn test_parse_flag_table() {
        let flags = RuntimeFlags::parse(SAMPLE);
        assert_eq!(flags.len(), 9);
        assert_eq!(flags.get("InitialHeapSize"), Some("268435456"));
        assert_eq!(flags.get("AbortVMOnException"), Some(""));
        assert!(flags.uses_compressed_pointers().unwrap());
    }

    #[test]
    fn test_sizing_from_flags() {
        let sizing = RuntimeFlags::parse(SAMPLE).sizing().unwrap();
        assert_eq!(sizing.heap_min_size, 268_435_456);
        assert_eq!(sizing.heap_max_size, 4 << 30);
        assert_eq!(sizing.heap_base, 2 << 30);
        assert_eq!(sizing.max_metaspace_size, 18_446_744_073_709_547_520);
        assert_eq!(sizing.compressed_class_space_size, 1 << 30);
    }

    #[test]
    fn test_missing_or_invalid_flag() {
        let flags = RuntimeFlags::parse("uintx MaxHeapSize := big {product}\n");
        assert!(matches!(flags.get_u64("MaxHeapSize"), Err(Error::ProbeFailed(_))));
        assert!(matches!(flags.sizing(), Err(Error::ProbeFailed(_))));
        assert!(matches!(flags.get_bool("UseCompressedOops"), Err(Error::ProbeFailed(_))));
    }
}
