//! Reader for the fixture dialect
//!
//! Only the subset the fixtures use is understood: top-level
//! `resource "<type>" "<label>" { ... }` blocks whose bodies hold
//! `key = "value"` string arguments. Blank lines and `#` comments are
//! skipped; anything else is a parse error.

use super::error::SimulatorError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub label: String,
    pub arguments: BTreeMap<String, String>,
}

impl ResourceBlock {
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

pub struct ConfigReader {
    header: Regex,
    argument: Regex,
    closing: Regex,
}

impl ConfigReader {
    pub fn new() -> Result<Self, SimulatorError> {
        Self::compile().map_err(SimulatorError::from)
    }

    /// Reader compiled on first use and shared by every caller
    pub fn shared() -> Result<&'static ConfigReader, SimulatorError> {
        static READER: OnceLock<Result<ConfigReader, regex::Error>> = OnceLock::new();

        READER
            .get_or_init(Self::compile)
            .as_ref()
            .map_err(|e| SimulatorError::from(e.clone()))
    }

    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(r#"^resource\s+"([^"]+)"\s+"([^"]+)"\s*\{$"#)?,
            argument: Regex::new(r#"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"([^"]*)"$"#)?,
            closing: Regex::new(r"^\}$")?,
        })
    }

    pub fn parse(&self, text: &str) -> Result<Vec<ResourceBlock>, SimulatorError> {
        let mut blocks = Vec::new();
        let mut current: Option<ResourceBlock> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let line_no = idx + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if current.is_some() && self.closing.is_match(line) {
                blocks.extend(current.take());
                continue;
            }

            match current.as_mut() {
                None => {
                    let caps = self.header.captures(line).ok_or_else(|| SimulatorError::ParseError {
                        line: line_no,
                        message: format!("expected a resource block, found `{}`", line),
                    })?;
                    current = Some(ResourceBlock {
                        resource_type: caps[1].to_string(),
                        label: caps[2].to_string(),
                        arguments: BTreeMap::new(),
                    });
                }
                Some(block) => {
                    let caps = self.argument.captures(line).ok_or_else(|| SimulatorError::ParseError {
                        line: line_no,
                        message: format!("expected `key = \"value\"`, found `{}`", line),
                    })?;
                    if block
                        .arguments
                        .insert(caps[1].to_string(), caps[2].to_string())
                        .is_some()
                    {
                        return Err(SimulatorError::ParseError {
                            line: line_no,
                            message: format!("argument '{}' set twice", &caps[1]),
                        });
                    }
                }
            }
        }

        if let Some(block) = current {
            return Err(SimulatorError::ParseError {
                line: text.lines().count(),
                message: format!("unclosed block for \"{}\" \"{}\"", block.resource_type, block.label),
            });
        }
        Ok(blocks)
    }
}
