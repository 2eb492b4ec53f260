//! Call scripts
//!
//! A script is a YAML or JSON list of calls. Each call names its opcode
//! either by method name (`op`) or by number (`opcode`); `args` are the
//! declared arguments after the opcode echo, which is added on replay.

use std::path::Path;

use anyhow::{bail, Context, Result};
use cosim_gateway::{Frame, OpcodeTable, Value};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Call {
    /// Method name, e.g. `setMeshVertices`
    #[serde(default)]
    pub op: Option<String>,
    /// Raw opcode, takes precedence over `op`
    #[serde(default)]
    pub opcode: Option<u8>,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keep replaying if this call fails
    #[serde(default)]
    pub allow_error: bool,
}

impl Call {
    /// Wire opcode of this call in the given table
    pub fn resolve(&self, table: &OpcodeTable) -> Result<u8> {
        match (&self.opcode, &self.op) {
            (Some(opcode), _) => Ok(*opcode),
            (None, Some(name)) => table.by_name(name).map(|e| e.opcode).with_context(|| {
                format!(
                    "\"{}\" is not an operation of the {} generation",
                    name,
                    table.generation()
                )
            }),
            (None, None) => bail!("call has neither `op` nor `opcode`"),
        }
    }

    /// Argument frame with the opcode echo in front
    pub fn frame(&self, opcode: u8) -> Frame {
        Frame::call(opcode, self.args.iter().cloned())
    }
}

pub fn parse(content: &str, json: bool) -> Result<Vec<Call>> {
    if json {
        serde_json::from_str(content).context("Failed to parse JSON script")
    } else {
        serde_yaml::from_str(content).context("Failed to parse YAML script")
    }
}

pub fn load(path: &Path) -> Result<Vec<Call>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    let json = path.extension().is_some_and(|e| e == "json");
    parse(&content, json).with_context(|| format!("Invalid script: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosim_gateway::Generation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_yaml_script() {
        let calls = parse(
            r#"
- op: constructor
  args: [{ str: Fluid }, { str: loopback.toml }, { int32: [0] }, { int32: [1] }]
- opcode: 10
- op: advance
  args: [{ float64: { rows: 1, cols: 1, data: [0.1] } }]
  allow_error: true
"#,
            false,
        )
        .unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].args[0], Value::str("Fluid"));
        assert!(calls[2].allow_error);

        let table = OpcodeTable::for_generation(Generation::Participant);
        assert_eq!(calls[0].resolve(&table).unwrap(), 0);
        assert_eq!(calls[1].resolve(&table).unwrap(), 10);
        assert_eq!(calls[2].resolve(&table).unwrap(), 11);
        assert_eq!(
            calls[2].frame(11),
            Frame::call(11, [Value::float64(0.1)])
        );
    }

    #[test]
    fn test_parse_json_script() {
        let calls = parse(r#"[{"op": "getDimensions"}]"#, true).unwrap();
        let table = OpcodeTable::for_generation(Generation::SolverInterface);
        assert_eq!(calls[0].resolve(&table).unwrap(), 20);

        let table = OpcodeTable::for_generation(Generation::Participant);
        assert!(calls[0].resolve(&table).is_err());
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("calls.json");
        std::fs::write(&json, r#"[{"opcode": 1}]"#).unwrap();
        assert_eq!(load(&json).unwrap()[0].opcode, Some(1));

        let yaml = dir.path().join("calls.yaml");
        std::fs::write(&yaml, "- op: destructor\n").unwrap();
        assert_eq!(load(&yaml).unwrap()[0].op.as_deref(), Some("destructor"));

        assert!(load(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_call_needs_an_opcode() {
        let calls = parse("- args: []", false).unwrap();
        let table = OpcodeTable::for_generation(Generation::Participant);
        assert!(calls[0].resolve(&table).is_err());
    }
}
