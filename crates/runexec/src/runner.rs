//! Script execution behind a narrow runner contract.
//! （以精簡介面執行腳本。）
//!
//! The workbench hands raw source text and a [`Console`] to a [`ScriptRunner`]
//! and never looks further. [`CommandRunner`] is the bundled implementation:
//! it pipes the source into an external interpreter and turns its stdout into
//! console lines.
//! 工作台只提供原始碼與主控台給執行器；`CommandRunner` 透過外部直譯器執行並擷取輸出。

use std::collections::BTreeMap;
use std::io::{self, ErrorKind, Read, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::console::{CapturedConsole, Console};

/// Errors raised while driving an interpreter process.
/// （執行直譯器進程時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn process: {0}")]
    Spawn(io::Error),
    #[error("process stdin not available")]
    StdinUnavailable,
    #[error("process output pipes not available")]
    OutputUnavailable,
    #[error("failed to write to stdin: {0}")]
    Stdin(io::Error),
    #[error("failed to read process output: {0}")]
    Output(io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(io::Error),
    #[error("failed to terminate process: {0}")]
    Kill(io::Error),
}

/// What a script "threw". Its display text becomes the `Error:` output line.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Thrown(String),
    #[error("script timed out after {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Executes source text, writing through the supplied console.
pub trait ScriptRunner {
    fn run(&mut self, source: &str, console: &mut dyn Console) -> Result<(), ScriptError>;
}

impl<R: ScriptRunner + ?Sized> ScriptRunner for Box<R> {
    fn run(&mut self, source: &str, console: &mut dyn Console) -> Result<(), ScriptError> {
        (**self).run(source, console)
    }
}

/// Runs `source` once and returns the output lines. A thrown error replaces
/// everything logged so far with a single `Error: <message>` line.
/// （執行一次並回傳輸出；若拋出錯誤，輸出僅剩一行 `Error:` 訊息。）
pub fn evaluate<R: ScriptRunner + ?Sized>(runner: &mut R, source: &str) -> Vec<String> {
    let mut console = CapturedConsole::new();
    match runner.run(source, &mut console) {
        Ok(()) => console.into_lines(),
        Err(err) => {
            debug!(error = %err, "script evaluation failed");
            vec![format!("Error: {err}")]
        }
    }
}

/// Interpreter invocation, serialisable so hosts can keep it in their config.
/// （可序列化的直譯器設定。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    /// `node` reading the script from stdin.
    pub fn node() -> Self {
        Self::new("node").with_args(["-"])
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self.timeout_ms = Some(millis);
        self
    }
}

/// Captured result of one interpreter process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }
}

/// [`ScriptRunner`] that feeds the source to an interpreter on stdin.
/// （將原始碼經由標準輸入交給外部直譯器的執行器。）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRunner {
    spec: CommandSpec,
}

impl CommandRunner {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Spawns the interpreter and waits for it, killing the process once the
    /// timeout elapses.
    ///
    /// `source` is written to stdin from its own thread while stdout and stderr
    /// are drained on reader threads, so a chatty interpreter can neither fill
    /// a pipe nor stall the timeout check.
    /// 以獨立執行緒寫入標準輸入並讀取輸出，避免管線阻塞而錯過逾時檢查。
    pub fn execute(&self, source: &str) -> Result<ProcessOutput, RunError> {
        let mut command = Command::new(&self.spec.program);
        command
            .args(&self.spec.args)
            .envs(&self.spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = command.spawn().map_err(RunError::Spawn)?;
        let stdin = child.stdin.take().ok_or(RunError::StdinUnavailable)?;
        let stdout = child.stdout.take().ok_or(RunError::OutputUnavailable)?;
        let stderr = child.stderr.take().ok_or(RunError::OutputUnavailable)?;

        let writer = spawn_writer(stdin, source.as_bytes().to_vec());
        let stdout_rx = spawn_reader(stdout);
        let stderr_rx = spawn_reader(stderr);

        let deadline = self
            .spec
            .timeout_ms
            .map(|millis| start + Duration::from_millis(millis));
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(RunError::Poll)? {
                break status;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                child.kill().map_err(RunError::Kill)?;
                timed_out = true;
                break child.wait().map_err(RunError::Poll)?;
            }
            thread::sleep(POLL_INTERVAL);
        };

        if writer.is_finished() {
            match writer.join() {
                Ok(Err(err)) if err.kind() != ErrorKind::BrokenPipe => {
                    return Err(RunError::Stdin(err));
                }
                _ => {}
            }
        }

        // descendants may still hold the pipes open after the child exits
        let drain_until = if timed_out {
            Some(Instant::now() + KILL_GRACE)
        } else {
            deadline.map(|deadline| deadline.max(Instant::now() + KILL_GRACE))
        };
        let stdout = collect(&stdout_rx, drain_until)?;
        let stderr = collect(&stderr_rx, drain_until)?;
        debug!(
            program = %self.spec.program,
            elapsed_ms = start.elapsed().as_millis() as u64,
            timed_out,
            "interpreter finished"
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            timed_out,
        })
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(15);
const KILL_GRACE: Duration = Duration::from_millis(200);

fn spawn_writer(mut stdin: ChildStdin, payload: Vec<u8>) -> JoinHandle<io::Result<()>> {
    thread::spawn(move || {
        stdin.write_all(&payload)?;
        stdin.flush()
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
        let _ = tx.send(result);
    });
    rx
}

// output still unread at `until` is dropped
fn collect(
    rx: &Receiver<io::Result<Vec<u8>>>,
    until: Option<Instant>,
) -> Result<Vec<u8>, RunError> {
    let received = match until {
        Some(until) => rx
            .recv_timeout(until.saturating_duration_since(Instant::now()))
            .ok(),
        None => rx.recv().ok(),
    };
    match received {
        Some(result) => result.map_err(RunError::Output),
        None => Ok(Vec::new()),
    }
}

impl ScriptRunner for CommandRunner {
    fn run(&mut self, source: &str, console: &mut dyn Console) -> Result<(), ScriptError> {
        let output = self.execute(source)?;
        if output.timed_out {
            let timeout = Duration::from_millis(self.spec.timeout_ms.unwrap_or_default());
            return Err(ScriptError::TimedOut(timeout));
        }
        for line in output.stdout.lines() {
            console.log(&[line.into()]);
        }
        if output.success() {
            return Ok(());
        }
        let message = output
            .stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match output.exit_code {
                Some(code) => format!("process exited with status {code}"),
                None => "process terminated by signal".to_string(),
            });
        Err(ScriptError::Thrown(message))
    }
}
