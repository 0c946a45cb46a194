//! Concatenation by stream copy through the concat demuxer.

use std::path::{Path, PathBuf};

use crate::args::ConcatArgs;
use crate::context::{Engine, JobContext};
use crate::workspace::{verify_nonempty, Workspace};
use crate::Result;

/// Concatenate `files` in order into `output` without re-encoding.
///
/// The list file is written into `workspace`. `total_secs` is the summed
/// duration of the inputs, used for progress. Returns the output size.
pub async fn concat(
    engine: &Engine,
    ctx: &JobContext,
    workspace: &Workspace,
    files: &[PathBuf],
    total_secs: f64,
    output: &Path,
    label: &str,
) -> Result<u64> {
    let list = workspace.write_concat_list("inputs.txt", files)?;
    let args = ConcatArgs {
        list_file: &list,
        output,
        container: engine.merge_settings().container,
    }
    .to_args();

    tracing::info!(job_id = %ctx.id, "Concatenating {} files into {:?}", files.len(), output);

    let result = engine
        .ffmpeg(ctx, "concat", args)
        .execute_tracked(engine.tracker(ctx, label, total_secs))
        .await;
    let _ = std::fs::remove_file(&list);
    result?;

    verify_nonempty(output)
}
