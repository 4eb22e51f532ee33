use std::time::{Duration, Instant};

use editore_runexec::{
    evaluate, CommandRunner, CommandSpec, LiveEvaluator, OutputKind, OutputLog,
};

fn bash() -> CommandRunner {
    CommandRunner::new(
        CommandSpec::new("bash")
            .with_args(["-s"])
            .with_timeout(Duration::from_secs(5)),
    )
}

#[test]
fn only_the_last_burst_edit_is_evaluated() {
    let start = Instant::now();
    let mut live = LiveEvaluator::default();
    let mut runner = bash();
    let mut history = OutputLog::new();

    for (offset, source) in [(0, "echo 1"), (100, "echo 12"), (250, "echo 123")] {
        live.schedule(source, start + Duration::from_millis(offset));
    }
    assert_eq!(live.poll(start + Duration::from_millis(600)), None);

    let fired = live
        .poll(start + Duration::from_millis(750))
        .expect("last edit fires after the delay");
    let output = evaluate(&mut runner, &fired).join("\n");
    history.record(output, 750);

    assert_eq!(history.len(), 1);
    assert_eq!(history.entries()[0].text, "123");
    assert_eq!(history.entries()[0].kind, OutputKind::Log);
}

#[test]
fn failures_are_recorded_as_error_entries() {
    let mut runner = bash();
    let mut history = OutputLog::new();
    history.record(evaluate(&mut runner, "echo fine").join("\n"), 1);
    history.record(evaluate(&mut runner, "echo nope >&2; exit 1").join("\n"), 2);

    let kinds: Vec<_> = history.entries().iter().map(|entry| entry.kind).collect();
    assert_eq!(kinds, vec![OutputKind::Log, OutputKind::Error]);
    assert_eq!(history.latest().unwrap().text, "Error: nope");
}
