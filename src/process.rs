// src/process.rs

use log::debug;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

/// Lines of stderr kept when describing a failed run
const FAILURE_TAIL_LINES: usize = 5;

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Result of one blocking external invocation.
#[derive(Debug, Clone)]
pub enum ToolRun {
    Completed(ToolOutput),
    SpawnFailed { command: String, reason: String },
}

impl ToolRun {
    pub fn success(&self) -> bool {
        matches!(self, ToolRun::Completed(out) if out.exit_code == Some(0))
    }

    pub fn describe_failure(&self) -> String {
        match self {
            ToolRun::SpawnFailed { command, reason } => format!("could not start `{command}`: {reason}"),
            ToolRun::Completed(out) => {
                let code = out
                    .exit_code
                    .map_or_else(|| "a signal".to_string(), |c| format!("exit code {c}"));
                let tail: Vec<&str> = out.stderr.lines().rev().take(FAILURE_TAIL_LINES).collect();
                if tail.is_empty() {
                    format!("`{}` ended with {}", out.command, code)
                } else {
                    let tail: Vec<&str> = tail.into_iter().rev().collect();
                    format!("`{}` ended with {}: {}", out.command, code, tail.join(" | "))
                }
            }
        }
    }
}

/// Runs `program` to completion in `cwd`. There is no timeout: a tool that
/// never exits blocks the caller.
pub fn run(program: &Path, args: &[String], cwd: &Path, env: &[(String, OsString)]) -> ToolRun {
    let command = std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running `{}` in {}", command, cwd.display());

    let start = Instant::now();
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (k, v)))
        .output();

    match output {
        Ok(output) => ToolRun::Completed(ToolOutput {
            command,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration_ms: start.elapsed().as_millis() as u64,
        }),
        Err(e) => ToolRun::SpawnFailed { command, reason: e.to_string() },
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(Path::new("sh"), &["-c".into(), "echo hello".into()], dir.path(), &[]);
        assert!(run.success());
        match run {
            ToolRun::Completed(out) => assert_eq!(out.stdout.trim(), "hello"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_zero_exit_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(Path::new("sh"), &["-c".into(), "echo broken >&2; exit 3".into()], dir.path(), &[]);
        assert!(!run.success());
        let reason = run.describe_failure();
        assert!(reason.contains("exit code 3"), "{reason}");
        assert!(reason.contains("broken"), "{reason}");
    }

    #[test]
    fn environment_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let env = [("MINER_PROBE".to_string(), OsString::from("on"))];
        let run = run(Path::new("sh"), &["-c".into(), "test \"$MINER_PROBE\" = on".into()], dir.path(), &env);
        assert!(run.success());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let run = run(Path::new("definitely-not-a-real-tool-xyz"), &[], dir.path(), &[]);
        assert!(matches!(run, ToolRun::SpawnFailed { .. }));
        assert!(!run.success());
    }
}
