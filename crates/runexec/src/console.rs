//! The logging-capable object handed to a script runner.
//! （交給腳本執行器的主控台物件。）

use serde_json::Value;

/// Sink a running script writes through, mirroring `console.log` / `console.error`.
pub trait Console {
    fn log(&mut self, args: &[Value]);
    fn error(&mut self, args: &[Value]);
}

/// Console that keeps every written line in order.
/// （依序記錄輸出行的主控台。）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedConsole {
    lines: Vec<String>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Convenience for runners producing plain text.
    pub fn log_text(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }
}

impl Console for CapturedConsole {
    /// One line per argument: strings verbatim, objects and arrays as compact JSON.
    fn log(&mut self, args: &[Value]) {
        self.lines.extend(args.iter().map(render_arg));
    }

    fn error(&mut self, args: &[Value]) {
        let joined = args.iter().map(join_form).collect::<Vec<_>>().join(" ");
        self.lines.push(format!("Error: {joined}"));
    }
}

fn render_arg(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// joining stringifies objects the way a template literal would
fn join_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(items) => items.iter().map(join_form).collect::<Vec<_>>().join(","),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_splits_arguments_into_lines() {
        let mut console = CapturedConsole::new();
        console.log(&[json!("hello"), json!(42), json!({"a": 1}), json!([1, 2]), json!(null)]);
        assert_eq!(
            console.lines(),
            &["hello", "42", r#"{"a":1}"#, "[1,2]", "null"]
        );
    }

    #[test]
    fn error_joins_arguments_on_one_line() {
        let mut console = CapturedConsole::new();
        console.error(&[json!("bad"), json!("input"), json!(7)]);
        console.error(&[json!({"k": "v"}), json!([1, "x"])]);
        assert_eq!(
            console.into_lines(),
            vec!["Error: bad input 7", "Error: [object Object] 1,x"]
        );
    }
}
