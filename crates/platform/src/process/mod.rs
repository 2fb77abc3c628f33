//! External tool execution for the command-backed adapters

use appxtract_config::ToolCommand;
use appxtract_errors::PlatformError;
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::Command;

/// Command builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Build a command from a configured tool, replacing `{name}` placeholders
    /// in its arguments with the matching value from `vars`
    #[must_use]
    pub fn from_template(tool: &ToolCommand, vars: &[(&str, &str)]) -> Self {
        let mut cmd = Self::new(&tool.program);
        for arg in &tool.args {
            let rendered = vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            });
            cmd.arg(rendered);
        }
        cmd
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<str>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// `program arg1 arg2`, for logs and error messages
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from command execution
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Trimmed stdout as text
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Run a command to completion
///
/// # Errors
///
/// Returns `ProcessExecutionFailed` if the program cannot be spawned or
/// exits unsuccessfully; the exit code and stderr are carried along.
pub async fn execute(cmd: &PlatformCommand) -> Result<CommandOutput, PlatformError> {
    let mut command = Command::new(cmd.program());
    command.args(cmd.get_args());
    if let Some(dir) = &cmd.current_dir {
        command.current_dir(dir);
    }

    tracing::debug!(command = %cmd.display(), "running external tool");
    let output = command
        .output()
        .await
        .map_err(|e| PlatformError::ProcessExecutionFailed {
            command: cmd.program().to_string(),
            exit_code: None,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(PlatformError::ProcessExecutionFailed {
            command: cmd.program().to_string(),
            exit_code: output.status.code(),
            message: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        });
    }

    Ok(CommandOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution() {
        let tool = ToolCommand::new(
            "builder",
            ["--src", "{staging}", "--out={output}", "{missing}"],
        );
        let cmd = PlatformCommand::from_template(
            &tool,
            &[("staging", "/tmp/stage"), ("output", "apps.cim")],
        );
        assert_eq!(cmd.program(), "builder");
        assert_eq!(
            cmd.get_args(),
            &["--src", "/tmp/stage", "--out=apps.cim", "{missing}"]
        );
        assert_eq!(cmd.display(), "builder --src /tmp/stage --out=apps.cim {missing}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_exit_code() {
        let mut cmd = PlatformCommand::new("sh");
        cmd.arg("-c").arg("echo broken >&2; exit 3");
        let err = execute(&cmd).await.unwrap_err();
        match err {
            PlatformError::ProcessExecutionFailed {
                exit_code, message, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(message, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let mut cmd = PlatformCommand::new("sh");
        cmd.arg("-c").arg("echo '  hello  '");
        let output = execute(&cmd).await.unwrap();
        assert_eq!(output.stdout_text(), "hello");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = PlatformCommand::new("appxtract-definitely-not-a-program");
        assert!(matches!(
            execute(&cmd).await,
            Err(PlatformError::ProcessExecutionFailed { exit_code: None, .. })
        ));
    }
}
