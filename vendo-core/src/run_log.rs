//! JSONL run log with one file per day.
//!
//! Each run appends five lines to `run-YYYY-MM-DD.jsonl`:
//!
//! ```text
//! {"ts":"2025-03-20T07:00:00Z","level":"info","msg":"snapshot_before","data":{"run":"1a2b3c4d","events":[...]}}
//! {"ts":...,"msg":"actions","data":{"run":...,"list":[...]}}
//! {"ts":...,"msg":"snapshot_after","data":{"run":...,"events":[...]}}
//! {"ts":...,"msg":"trace","data":{"run":...,"steps":[...]}}
//! {"ts":...,"msg":"plan","data":{"run":...,"placed":[...],"frozen":[...],"unschedulable":[...],"colors":[...]}}
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{VendoError, VendoResult};
use crate::run::{RunLogSink, RunResult};

pub struct JsonlRunLog {
    dir: PathBuf,
}

impl JsonlRunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonlRunLog { dir: dir.into() }
    }

    /// File the given run is appended to.
    pub fn file_for(&self, result: &RunResult) -> PathBuf {
        self.dir
            .join(format!("run-{}.jsonl", result.started_at.format("%Y-%m-%d")))
    }

    fn sections(result: &RunResult) -> VendoResult<Vec<(&'static str, Value)>> {
        let run = &result.run_id;

        let mut plan = json!({ "run": run, "colors": to_value(&result.colors)? });
        if let (Value::Object(map), Value::Object(entries)) = (&mut plan, to_value(&result.plan)?) {
            map.extend(entries);
        }

        Ok(vec![
            (
                "snapshot_before",
                json!({ "run": run, "events": to_value(&result.snapshot_before)? }),
            ),
            ("actions", json!({ "run": run, "list": to_value(&result.actions)? })),
            (
                "snapshot_after",
                json!({ "run": run, "events": to_value(&result.snapshot_after)? }),
            ),
            ("trace", json!({ "run": run, "steps": result.trace })),
            ("plan", plan),
        ])
    }
}

fn to_value<T: Serialize>(value: &T) -> VendoResult<Value> {
    serde_json::to_value(value).map_err(|e| VendoError::Serialization(e.to_string()))
}

impl RunLogSink for JsonlRunLog {
    fn record(&self, result: &RunResult) -> VendoResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            VendoError::RunLog(format!("Could not create {}: {e}", self.dir.display()))
        })?;

        let path = self.file_for(result);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| VendoError::RunLog(format!("Could not open {}: {e}", path.display())))?;

        let mut buffer = String::new();
        for (msg, data) in Self::sections(result)? {
            let line = json!({
                "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                "level": "info",
                "msg": msg,
                "data": data,
            });
            buffer.push_str(&line.to_string());
            buffer.push('\n');
        }

        file.write_all(buffer.as_bytes())
            .map_err(|e| VendoError::RunLog(format!("Could not write {}: {e}", path.display())))?;
        Ok(())
    }
}
