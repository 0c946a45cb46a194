//! Container remuxing.

use std::path::Path;

use crate::args::RemuxArgs;
use crate::context::{Engine, JobContext};
use crate::workspace::verify_nonempty;
use crate::Result;

/// Stream-copy every stream of `input` into `output` in the target container.
///
/// `duration_secs` is the input's duration, used for progress.
pub async fn remux(
    engine: &Engine,
    ctx: &JobContext,
    input: &Path,
    output: &Path,
    duration_secs: f64,
    label: &str,
) -> Result<()> {
    let args = RemuxArgs {
        input,
        output,
        container: engine.merge_settings().container,
    }
    .to_args();

    tracing::info!(job_id = %ctx.id, "Remuxing {:?} -> {:?}", input, output);

    engine
        .ffmpeg(ctx, "remux", args)
        .execute_tracked(engine.tracker(ctx, label, duration_secs))
        .await?;
    verify_nonempty(output)?;

    tracing::info!(job_id = %ctx.id, "Successfully remuxed: {:?}", input);
    Ok(())
}
