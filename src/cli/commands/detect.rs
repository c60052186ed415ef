//! Detect command - decide whether the buildpack applies

use crate::cli::args::DetectArgs;
use crate::cli::commands::{EXIT_DETECT_FAIL, EXIT_PASS};
use crate::detect::Detect;
use crate::error::{BuildpackError, BuildpackResult};
use tracing::debug;

/// Execute the detect command
pub async fn execute(args: DetectArgs) -> BuildpackResult<u8> {
    let app_dir = args.app_dir.clone();
    let result = tokio::task::spawn_blocking(move || Detect.detect(&app_dir))
        .await
        .map_err(|e| BuildpackError::Internal(format!("detect task failed: {}", e)))??;

    if !result.pass {
        debug!("{} is not a Solana program", args.app_dir.display());
        return Ok(EXIT_DETECT_FAIL);
    }

    if let Some(ref plan) = args.plan {
        let content = result.plan_toml()?;
        tokio::fs::write(plan, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing build plan {}", plan.display()), e))?;
        debug!("Wrote build plan to {}", plan.display());
    }

    Ok(EXIT_PASS)
}
