use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, SourceError};

/// Captured result of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub cwd: Option<PathBuf>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stdout followed by stderr, for error messages.
    pub fn combined(&self) -> String {
        let mut out = self.stdout_str();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally inside `cwd`, and capture its
    /// output. A non-zero exit is not an error at this level.
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// Runs commands with `std::process::Command`, resolving programs on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::ToolNotFound {
                program: program.to_string(),
            },
            _ => SourceError::CommandFailed {
                command: format_command(program, args),
                output: e.to_string(),
            },
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            cwd: cwd.map(Path::to_path_buf),
        })
    }
}

/// Render a command line the way a user would type it.
pub fn format_command(program: &str, args: &[String]) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
            line.push('\'');
            line.push_str(&arg.replace('\'', r"'\''"));
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Run a command, log its output at debug level and fail on non-zero exit.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<CommandOutput> {
    let command = format_command(program, args);
    match cwd {
        Some(dir) => log::debug!("Running `{}` in {}", command, dir.display()),
        None => log::debug!("Running `{}`", command),
    }

    let output = runner.run(program, args, cwd)?;

    if log::log_enabled!(log::Level::Debug) {
        let text = output.stdout_str();
        if text.trim().is_empty() {
            log::debug!("    --> No output");
        } else {
            for line in text.lines() {
                log::debug!("    --> {}", line);
            }
        }
    }

    if !output.success() {
        return Err(SourceError::CommandFailed {
            command,
            output: output.combined(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeRunner;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_command_quotes_when_needed() {
        assert_eq!(format_command("git", &args(&["rev-parse", "HEAD"])), "git rev-parse HEAD");
        assert_eq!(
            format_command("puppet", &args(&["--target-dir", "/tmp/a b"])),
            "puppet --target-dir '/tmp/a b'"
        );
        assert_eq!(format_command("echo", &args(&[""])), "echo ''");
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            status: Some(1),
            stdout: b"out".to_vec(),
            stderr: "err".to_string(),
            cwd: None,
        };
        assert_eq!(output.combined(), "out\nerr");
        assert!(!output.success());
    }

    #[test]
    fn test_run_checked_fails_on_non_zero_exit() {
        let runner = FakeRunner::new();
        runner.on("svn info", 1, "", "svn: E155007: not a working copy");

        let err = run_checked(&runner, "svn", &args(&["info"]), None).unwrap_err();
        match err {
            SourceError::CommandFailed { command, output } => {
                assert_eq!(command, "svn info");
                assert!(output.contains("E155007"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_system_runner_reports_missing_tool() {
        let err = SystemCommandRunner
            .run("forgekit-definitely-not-installed", &[], None)
            .unwrap_err();
        assert!(matches!(err, SourceError::ToolNotFound { .. }));
    }
}
