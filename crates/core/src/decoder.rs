//! External map decoder invocation.
//!
//! The decoder is a separate conversion tool that turns a binary map into the
//! line-delimited record format read by [`crate::records::RecordReader`].

use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// Environment variable carrying the memory ceiling to the decoder.
pub const MEMORY_ENV: &str = "ITEMAUDIT_DECODER_MEMORY_MB";

const STDERR_TAIL_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: String,
    /// Arguments; `{input}` and `{output}` are substituted
    pub args: Vec<String>,
    pub memory_limit_mb: Option<u64>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: "map2jsonl".to_string(),
            args: vec![INPUT_PLACEHOLDER.to_string(), OUTPUT_PLACEHOLDER.to_string()],
            memory_limit_mb: None,
        }
    }
}

impl DecoderConfig {
    pub fn resolve_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Runs the decoder on `map`, producing the record file at `output`.
pub fn decode_map(config: &DecoderConfig, map: &Path, output: &Path) -> Result<()> {
    if !map.is_file() {
        return Err(AuditError::io(
            map,
            std::io::Error::new(std::io::ErrorKind::NotFound, "map file not found"),
        ));
    }

    let args = config.resolve_args(map, output);
    let mut command = Command::new(&config.program);
    command.args(&args);
    if let Some(limit) = config.memory_limit_mb {
        command.env(MEMORY_ENV, limit.to_string());
    }

    info!("Decoding {} with {}", map.display(), config.program);
    debug!("Decoder arguments: {:?}", args);

    let result = command
        .output()
        .map_err(|e| AuditError::Decoder(format!("failed to start '{}': {e}", config.program)))?;

    if !result.status.success() {
        return Err(AuditError::Decoder(format!(
            "'{}' exited with {}: {}",
            config.program,
            result.status,
            stderr_tail(&result.stderr)
        )));
    }
    if !output.is_file() {
        return Err(AuditError::Decoder(format!(
            "'{}' finished but produced no {}",
            config.program,
            output.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let config = DecoderConfig {
            program: "tool".into(),
            args: vec!["--in={input}".into(), "-o".into(), "{output}".into()],
            memory_limit_mb: Some(4096),
        };
        assert_eq!(
            config.resolve_args(Path::new("world.otbm"), Path::new("/tmp/out.jsonl")),
            vec!["--in=world.otbm", "-o", "/tmp/out.jsonl"]
        );
    }

    #[test]
    fn tail_keeps_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 19"));
    }

    #[test]
    fn missing_map_is_fatal() {
        let err = decode_map(
            &DecoderConfig::default(),
            Path::new("/no/such/world.otbm"),
            Path::new("/tmp/out.jsonl"),
        )
        .unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("world.otbm");
        std::fs::write(&map, b"map").unwrap();

        let config = DecoderConfig {
            program: "sh".into(),
            args: vec!["-c".into(), "echo broken >&2; exit 3".into()],
            memory_limit_mb: None,
        };
        let err = decode_map(&config, &map, &dir.path().join("out.jsonl")).unwrap_err();
        match err {
            AuditError::Decoder(msg) => assert!(msg.contains("broken"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_produces_output() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("world.otbm");
        std::fs::write(&map, b"map").unwrap();
        let out = dir.path().join("out.jsonl");

        let config = DecoderConfig {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                "echo '{\"id\":1,\"x\":1,\"y\":1,\"z\":7}' > \"$1\"".into(),
                "sh".into(),
                OUTPUT_PLACEHOLDER.into(),
            ],
            memory_limit_mb: Some(512),
        };
        decode_map(&config, &map, &out).unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("\"id\":1"));
    }
}
