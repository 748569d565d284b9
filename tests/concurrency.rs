//! A single formatter shared across tasks yields the same lines as
//! sequential use.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use json_context_formatter::{ContextFormatter, FormatterConfig, Level, LogRecord};
use serde_json::{json, Value};

fn record(n: u64) -> LogRecord {
    let context = json!({ "n": n, "message": format!("shadow {n}"), "context": { "k": n } });
    LogRecord::new("worker", Level::Info, format!("job {n} done"))
        .with_datetime(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        .with_context(context.as_object().cloned().unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_formatter_is_deterministic_across_tasks() {
    let formatter = Arc::new(
        ContextFormatter::pure_json(FormatterConfig::new().application("svc").default_category("jobs"))
            .unwrap(),
    );

    let expected: Vec<String> = (0..64).map(|n| formatter.format(&record(n)).unwrap()).collect();

    let mut handles = Vec::new();
    for n in 0..64u64 {
        let formatter = Arc::clone(&formatter);
        handles.push(tokio::spawn(async move { formatter.format(&record(n)).unwrap() }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let line = handle.await.unwrap();
        assert_eq!(line, expected[n]);

        let body: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(body["message"], format!("job {n} done"));
        assert_eq!(body["context"]["message"], format!("shadow {n}"));
        assert_eq!(body["context"]["k"], n as u64);
    }
}
