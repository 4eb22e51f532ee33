//! Script evaluation for the Editore workbench: the injected console, the
//! runner contract, debounced live re-evaluation and the output history.
//! （腳本執行相關元件：主控台、執行器介面、即時評估與輸出紀錄。）

pub mod console;
pub mod live;
pub mod output;
pub mod runner;

pub use console::{CapturedConsole, Console};
pub use live::{CancellationToken, LiveEvaluator, DEFAULT_LIVE_DELAY};
pub use output::{OutputEntry, OutputFilter, OutputKind, OutputLog, ERROR_PREFIX};
pub use runner::{
    evaluate, CommandRunner, CommandSpec, ProcessOutput, RunError, ScriptError, ScriptRunner,
};
