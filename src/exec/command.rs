// src/exec/command.rs

//! Shell command runner with atomic publish.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, VariableConfig};
use crate::dag::{ScheduledTask, TaskId};
use crate::exec::runner::{RunnerError, RunnerErrorKind, RunnerFuture, TaskRunner};
use crate::exec::template::CommandTemplate;
use crate::fs::FileSystem;
use crate::oracle::ArtifactLayout;
use crate::params::time::{format_cycle, hh, leadtime_hours, yyyymmdd};

/// Number of trailing stderr lines kept for failure messages.
const STDERR_TAIL: usize = 5;

/// Everything outside the node id that a command template can refer to.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub layout: ArtifactLayout,
    pub baseline: String,
    pub forecast: String,
    pub variables: BTreeMap<String, VariableConfig>,
}

impl RunContext {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            layout: ArtifactLayout::from_config(cfg),
            baseline: cfg.baseline.name.clone(),
            forecast: cfg.forecast.name.clone(),
            variables: cfg.variables.clone(),
        }
    }

    /// Placeholder values for `task`, writing to `output`.
    ///
    /// Paths are shell-quoted; every other value is substituted as is.
    pub fn placeholders(
        &self,
        task: &ScheduledTask,
        output: &Path,
    ) -> HashMap<&'static str, String> {
        let id = &task.id;
        let cycle = id.cycle();
        let inputs: Vec<String> = task
            .deps
            .iter()
            .map(|dep| shell_quote(&self.layout.path_for(dep)))
            .collect();

        let mut values = HashMap::from([
            ("output", shell_quote(output)),
            ("inputs", inputs.join(" ")),
            ("cycle", format_cycle(&cycle)),
            ("yyyymmdd", yyyymmdd(&cycle)),
            ("hh", hh(&cycle)),
            ("baseline", self.baseline.clone()),
            ("forecast", self.forecast.clone()),
        ]);

        if let Some(leadtime) = id.leadtime() {
            values.insert("leadtime", leadtime_hours(&leadtime));
            values.insert("validtime", format_cycle(&(cycle + leadtime)));
        }

        if let Some(source) = id.source() {
            values.insert("source", source.to_string());
        }

        if let Some(variable) = id.variable() {
            values.insert("variable", variable.to_string());
            if let Some(var) = self.variables.get(variable) {
                values.insert("name", var.name.clone());
                values.insert("level_type", var.level_type.to_string());
            }
            let level = id.level().map(|l| l.value().to_string()).unwrap_or_default();
            values.insert("level", level);
        }

        values
    }
}

/// Runs a rendered template with `sh -c` and publishes `{output}` over the
/// node's artifact on success.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    template: Arc<CommandTemplate>,
    ctx: Arc<RunContext>,
    fs: Arc<dyn FileSystem>,
}

impl CommandRunner {
    pub fn new(template: CommandTemplate, ctx: Arc<RunContext>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            template: Arc::new(template),
            ctx,
            fs,
        }
    }
}

impl TaskRunner for CommandRunner {
    fn execute(&self, task: ScheduledTask) -> RunnerFuture {
        let this = self.clone();
        Box::pin(async move { this.run(task).await })
    }
}

/// Quote `path` as one `sh` word.
fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    shlex::try_quote(&raw)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| format!("'{}'", raw.replace('\'', "'\\''")))
}

/// Hidden sibling the command writes before the rename.
pub fn temp_path_for(artifact: &Path) -> PathBuf {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

impl CommandRunner {
    async fn run(&self, task: ScheduledTask) -> Result<(), RunnerError> {
        let id = task.id.clone();
        let artifact = self.ctx.layout.path_for(&id);
        let temp = temp_path_for(&artifact);
        let fail = |kind, message: String| RunnerError::new(id.clone(), kind, message);

        let dir = artifact.parent().map(Path::to_path_buf).unwrap_or_default();
        self.fs
            .create_dir_all(&dir)
            .map_err(|e| fail(RunnerErrorKind::Publish, format!("{e:#}")))?;
        // Leftover from an interrupted earlier attempt.
        let _ = self.fs.remove_file(&temp);

        let cmdline = self.template.render(&self.ctx.placeholders(&task, &temp));
        info!(task = %id, cmd = %cmdline, "starting task process");

        let status = self.spawn_and_wait(&id, &cmdline).await;
        let (status, stderr_tail) = match status {
            Ok(done) => done,
            Err(err) => {
                let _ = self.fs.remove_file(&temp);
                return Err(err);
            }
        };

        if !status.success() {
            let _ = self.fs.remove_file(&temp);
            let code = status.code().unwrap_or(-1);
            let message = if stderr_tail.is_empty() {
                format!("command `{cmdline}` failed")
            } else {
                stderr_tail.join("\n")
            };
            return Err(fail(RunnerErrorKind::Exit(code), message));
        }

        self.publish(&id, &temp, &artifact)
    }

    /// Returns the exit status and the stderr tail.
    async fn spawn_and_wait(
        &self,
        id: &TaskId,
        cmdline: &str,
    ) -> Result<(ExitStatus, Vec<String>), RunnerError> {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmdline);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmdline);
            c
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            RunnerError::new(
                id.clone(),
                RunnerErrorKind::Spawn,
                format!("spawning `{cmdline}`: {e}"),
            )
        })?;

        // Always consume both pipes so buffers don't fill; log at debug.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(log_lines(id.clone(), "stdout", stdout, 0));
        }
        let stderr = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(log_lines(id.clone(), "stderr", stderr, STDERR_TAIL)));

        let status = child.wait().await.map_err(|e| {
            RunnerError::new(
                id.clone(),
                RunnerErrorKind::Spawn,
                format!("waiting for `{cmdline}`: {e}"),
            )
        })?;

        let tail = match stderr {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };

        info!(
            task = %id,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            "task process exited"
        );

        Ok((status, tail))
    }

    fn publish(&self, id: &TaskId, temp: &Path, artifact: &Path) -> Result<(), RunnerError> {
        let fail =
            |message: String| RunnerError::new(id.clone(), RunnerErrorKind::Publish, message);

        match self.fs.file_len(temp) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(fail(format!(
                    "command exited 0 but wrote nothing to {}",
                    temp.display()
                )));
            }
            Err(e) => return Err(fail(format!("{e:#}"))),
        }

        if let Err(e) = self.fs.rename(temp, artifact) {
            let _ = self.fs.remove_file(temp);
            warn!(task = %id, error = %e, "could not publish artifact");
            return Err(fail(format!("{e:#}")));
        }

        debug!(task = %id, artifact = %artifact.display(), "published artifact");
        Ok(())
    }
}

/// Log every line of `pipe`, returning the last `keep` lines.
async fn log_lines<R>(id: TaskId, stream: &'static str, pipe: R, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    let mut tail = VecDeque::with_capacity(keep);

    while let Ok(Some(line)) = lines.next_line().await {
        debug!(task = %id, "{}: {}", stream, line);
        if keep > 0 {
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    tail.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_quoted_only_when_needed() {
        assert_eq!(shell_quote(Path::new("/data/grids/f.nc")), "/data/grids/f.nc");
        for raw in ["/my data/f.nc", "/a;rm -rf b", "/run's/$HOME/f.nc"] {
            let quoted = shell_quote(Path::new(raw));
            assert_ne!(quoted, raw);
            assert_eq!(shlex::split(&quoted), Some(vec![raw.to_string()]));
        }
    }
}
