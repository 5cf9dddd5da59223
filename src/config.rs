//! # Harness configuration
//!
//! Settings are read from a JSON file, every key is optional and has a default.
//! ```json
//! {
//!     "tools": {
//!         "asm": { "program": "xas99.py", "args": ["-R"], "defaults_var": "XAS99" },
//!         "disasm": { "program": "xda99.py", "args": ["-R"], "defaults_var": "XDA99" }
//!     },
//!     "vectors": { "capacity": 8192, "base": "0xa000", "filler": "0x1000", "random_runs": 8, "block_size": 2048 },
//!     "compare": { "length_tolerance": 4 },
//!     "faults": ["Traceback (most recent call last)"],
//!     "markers": { "comment": ";", "error_tag": "ERROR", "warning_tag": "WARN" },
//!     "fixtures": ["errors/opcodes.asm"]
//! }
//! ```
//! Numbers may be given as JSON numbers or as strings with a `0x` prefix.
//! Fixture paths are annotated sources for the error path scenarios, relative to the configuration file.

use std::collections::BTreeMap;
use log::{debug,error};
use crate::tools::{ToolSpec,default_faults};
use crate::gen::fixtures::MarkerStyle;
use crate::gen::NOP;
use crate::DYNERR;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("configuration is not valid JSON")]
    Syntax,
    #[error("configuration key `{0}` has the wrong type")]
    KeyType(String),
    #[error("tool `{0}` has no program")]
    MissingProgram(String)
}

#[derive(Clone,PartialEq,Debug)]
pub struct VectorSettings {
    pub capacity: usize,
    pub base: u16,
    pub filler: u16,
    pub random_runs: usize,
    pub block_size: usize
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            capacity: 0x2000,
            base: 0xa000,
            filler: NOP,
            random_runs: 8,
            block_size: 2048
        }
    }
}

#[derive(Clone,Debug)]
pub struct HarnessConfig {
    pub tools: BTreeMap<String,ToolSpec>,
    pub vectors: VectorSettings,
    /// how much longer a reconstructed image may be than the original
    pub length_tolerance: usize,
    pub faults: Vec<String>,
    pub markers: MarkerStyle,
    pub fixtures: Vec<String>
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tools: BTreeMap::new(),
            vectors: VectorSettings::default(),
            length_tolerance: 4,
            faults: default_faults(),
            markers: MarkerStyle::default(),
            fixtures: Vec::new()
        }
    }
}

fn get_usize(obj: &json::JsonValue,key: &str,default: usize) -> Result<usize,Error> {
    let val = &obj[key];
    if val.is_null() {
        return Ok(default);
    }
    if let Some(n) = val.as_usize() {
        return Ok(n);
    }
    if let Some(s) = val.as_str() {
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex,16),
            None => s.parse::<usize>()
        };
        if let Ok(n) = parsed {
            return Ok(n);
        }
    }
    error!("`{}` should be a number",key);
    Err(Error::KeyType(key.to_string()))
}

fn get_u16(obj: &json::JsonValue,key: &str,default: u16) -> Result<u16,Error> {
    match u16::try_from(get_usize(obj,key,default as usize)?) {
        Ok(n) => Ok(n),
        Err(_) => Err(Error::KeyType(key.to_string()))
    }
}

fn get_string(obj: &json::JsonValue,key: &str,default: &str) -> Result<String,Error> {
    let val = &obj[key];
    if val.is_null() {
        return Ok(default.to_string());
    }
    match val.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(Error::KeyType(key.to_string()))
    }
}

fn get_strings(val: &json::JsonValue,key: &str) -> Result<Vec<String>,Error> {
    let mut ans = Vec::new();
    if !val.is_array() {
        return Err(Error::KeyType(key.to_string()));
    }
    for item in val.members() {
        match item.as_str() {
            Some(s) => ans.push(s.to_string()),
            None => return Err(Error::KeyType(key.to_string()))
        }
    }
    Ok(ans)
}

impl HarnessConfig {
    pub fn from_json(json_str: &str) -> Result<Self,DYNERR> {
        let parsed = match json::parse(json_str) {
            Ok(p) => p,
            Err(_) => return Err(Box::new(Error::Syntax))
        };
        let mut ans = Self::default();
        for (name,obj) in parsed["tools"].entries() {
            let program = get_string(obj,"program","")?;
            if program.len()==0 {
                return Err(Box::new(Error::MissingProgram(name.to_string())));
            }
            let args = match obj["args"].is_null() {
                true => Vec::new(),
                false => get_strings(&obj["args"],"args")?
            };
            let defaults_var = match obj["defaults_var"].as_str() {
                Some(v) => Some(v.to_string()),
                None => None
            };
            ans.tools.insert(name.to_string(),ToolSpec {
                name: name.to_string(),
                program,
                args,
                defaults_var
            });
        }
        let vec = &parsed["vectors"];
        let dflt = VectorSettings::default();
        ans.vectors = VectorSettings {
            capacity: get_usize(vec,"capacity",dflt.capacity)?,
            base: get_u16(vec,"base",dflt.base)?,
            filler: get_u16(vec,"filler",dflt.filler)?,
            random_runs: get_usize(vec,"random_runs",dflt.random_runs)?,
            block_size: get_usize(vec,"block_size",dflt.block_size)?
        };
        ans.length_tolerance = get_usize(&parsed["compare"],"length_tolerance",ans.length_tolerance)?;
        if !parsed["faults"].is_null() {
            ans.faults = get_strings(&parsed["faults"],"faults")?;
        }
        let mk = &parsed["markers"];
        let dm = MarkerStyle::default();
        ans.markers = MarkerStyle::new(
            &get_string(mk,"comment",&dm.comment)?,
            &get_string(mk,"error_tag",&dm.error_tag)?,
            &get_string(mk,"warning_tag",&dm.warning_tag)?
        );
        if !parsed["fixtures"].is_null() {
            ans.fixtures = get_strings(&parsed["fixtures"],"fixtures")?;
        }
        debug!("configured {} tools",ans.tools.len());
        Ok(ans)
    }
    pub fn from_file(path: &std::path::Path) -> Result<Self,DYNERR> {
        let txt = std::fs::read_to_string(path)?;
        Self::from_json(&txt)
    }
    pub fn tool(&self,name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }
}
