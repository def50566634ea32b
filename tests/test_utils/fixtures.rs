//! Fixtures shared by the transport integration tests: a live collector, a
//! throwaway overflow directory, and a configuration tuned for fast tests.

use std::{fs, path::Path, time::Duration};

use femtosyslog::{TransportConfig, test_utils::Collector};
use rstest::fixture;
use tempfile::TempDir;

/// Upper bound on how long a test waits for lines to arrive.
pub const WAIT: Duration = Duration::from_secs(5);

#[fixture]
pub fn collector() -> Collector {
    Collector::start()
}

#[fixture]
pub fn spill_dir() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

/// Configuration writing overflow files into `dir` with short timeouts.
pub fn config_in(dir: &TempDir) -> TransportConfig {
    TransportConfig::default()
        .with_overflow_dir(dir.path())
        .with_send_timeout(Duration::from_millis(500))
        .with_linger(Duration::from_millis(50))
}

/// Every line stored in the overflow directory, sorted.
pub fn spilled_lines(dir: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_dir(dir)
        .expect("list overflow dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| !name.to_string_lossy().starts_with('.'))
        })
        .flat_map(|path| {
            let text = fs::read_to_string(&path).expect("read overflow file");
            text.lines().map(str::to_owned).collect::<Vec<_>>()
        })
        .collect();
    lines.sort();
    lines
}
