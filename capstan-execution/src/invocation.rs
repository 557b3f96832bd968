//! Processor invocations rendered as tool command lines
//!
//! A processor job names a processor plus three argument maps (inputs,
//! outputs, parameters). The process tool receives the merged maps as a
//! flat `--key=value` list, with list values repeated per element.

use std::collections::BTreeMap;

use serde::Deserialize;

use capstan_config::ToolsConfig;

use crate::command::CommandSpec;
use crate::error::{ExecutionError, ExecutionResult};

/// A single argument value: scalar or a list rendered as repeated flags
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Flatten into the strings rendered after `--key=`
    fn render(&self, key: &str) -> ExecutionResult<Vec<String>> {
        match self {
            ArgValue::Text(value) => Ok(vec![value.clone()]),
            ArgValue::Number(value) => Ok(vec![value.to_string()]),
            ArgValue::Bool(value) => Ok(vec![value.to_string()]),
            ArgValue::List(values) => {
                let mut rendered = Vec::with_capacity(values.len());
                for value in values {
                    if matches!(value, ArgValue::List(_)) {
                        return Err(ExecutionError::InvalidInvocation(format!(
                            "argument '{}' contains a nested list",
                            key
                        )));
                    }
                    rendered.extend(value.render(key)?);
                }
                Ok(rendered)
            }
        }
    }
}

/// One processor job: named processor plus its three argument maps
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorJob {
    pub processor: String,

    #[serde(default)]
    pub inputs: BTreeMap<String, ArgValue>,

    #[serde(default)]
    pub outputs: BTreeMap<String, ArgValue>,

    #[serde(default)]
    pub parameters: BTreeMap<String, ArgValue>,
}

impl ProcessorJob {
    /// Merge the three maps into one `--key=value` argument list.
    ///
    /// A key appearing in more than one map is rejected; the merge must not
    /// silently drop a value.
    pub fn to_args(&self) -> ExecutionResult<Vec<String>> {
        let mut merged: BTreeMap<&str, &ArgValue> = BTreeMap::new();

        for map in [&self.inputs, &self.outputs, &self.parameters] {
            for (key, value) in map {
                if merged.insert(key.as_str(), value).is_some() {
                    return Err(ExecutionError::InvalidInvocation(format!(
                        "duplicate argument key '{}' for processor '{}'",
                        key, self.processor
                    )));
                }
            }
        }

        let mut args = Vec::new();
        for (key, value) in merged {
            for rendered in value.render(key)? {
                args.push(format!("--{}={}", key, rendered));
            }
        }
        Ok(args)
    }

    /// Full command line for the process tool's exec-process mode
    pub fn to_command(&self, tools: &ToolsConfig) -> ExecutionResult<CommandSpec> {
        if self.processor.trim().is_empty() {
            return Err(ExecutionError::InvalidInvocation(
                "processor name is empty".to_string(),
            ));
        }

        let spec = CommandSpec::new(&tools.process_exe)
            .arg("exec-process")
            .arg(&self.processor)
            .args(self.to_args()?);
        Ok(spec)
    }
}
