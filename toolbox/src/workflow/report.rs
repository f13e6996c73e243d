use crate::workflow::runner::WorkflowResult;
use anyhow::Context;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Appends one summary line per tool run to the report at `path`.
pub fn append_report(path: &Path, results: &[WorkflowResult]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report folder {}", parent.display()))?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening report {}", path.display()))?;
    for result in results {
        writeln!(file, "{}", result.summary_line())
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(())
}
