// Shared test helpers: synthetic trial files and corpora
//
// Conditions place the target on the x axis at `2^id - 1` with a unit target,
// so each condition's index of difficulty is exactly `id` bits.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const LATENCIES: [u32; 3] = [0, 100, 200];
pub const IDS: [f64; 3] = [1.0, 2.0, 3.0];

/// Movement time generator used by the synthetic corpus
pub fn model_time(id: f64, latency_ms: u32) -> f64 {
    0.5 + 0.2 * id + 0.3 * f64::from(latency_ms) * id / 1000.0
}

/// Render a trial file with a two-sample trace
///
/// The trace starts at the source and ends on the target center (hit) or a
/// quarter of the way there (miss).
pub fn trial_text(experiment: usize, latency_ms: u32, id: f64, duration: f64, hit: bool) -> String {
    let distance = id.exp2() - 1.0;
    let end_x = if hit { distance } else { distance / 4.0 };
    let start = 100.0;

    format!(
        "Experiment: {experiment}\n\
         Latency: {latency_ms}\n\
         Source: (0, 0, 0)\n\
         SourceSize: 0.5\n\
         Target: ({distance}, 0, 0)\n\
         TargetSize: 1\n\
         \n\
         Trace:\n\
         time; position; button;\n\
         {start}; (0, 0, 0); False;\n\
         {end}; ({end_x}, 0, 0); True;\n",
        end = start + duration
    )
}

pub fn write_trial(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Corpus with every (latency, condition) cell holding one hit and one miss
///
/// Sessions are split by latency: `session_<latency>/`.
pub fn synthetic_corpus() -> TempDir {
    let root = TempDir::new().unwrap();

    for latency in LATENCIES {
        let session = root.path().join(format!("session_{latency:03}"));
        for (experiment, &id) in IDS.iter().enumerate() {
            let time = model_time(id, latency);
            write_trial(
                &session,
                &format!("20240311T1015{experiment:02}00_trace_a{experiment}.txt"),
                &trial_text(experiment, latency, id, time, true),
            );
            write_trial(
                &session,
                &format!("20240311T1015{experiment:02}30_trace_b{experiment}.txt"),
                &trial_text(experiment, latency, id, time + 0.25, false),
            );
        }
    }

    root
}

/// Number of trial files written by `synthetic_corpus`
pub fn synthetic_trial_count() -> usize {
    LATENCIES.len() * IDS.len() * 2
}
