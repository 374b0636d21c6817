use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use sprig_db::bundle::BundleManifest;
use sprig_db::service::SprigService;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ExportArgs;
use crate::context::AppContext;
use crate::output::output;
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct ExportResponse {
    path: String,
    manifest: BundleManifest,
}

/// Handle `sprig export`.
pub async fn handle(args: &ExportArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    if let Some(inspect) = &args.inspect {
        let manifest = SprigService::inspect_bundle(Path::new(inspect))
            .with_context(|| format!("failed to read bundle {inspect}"))?;
        return output(&manifest, flags.format);
    }

    let path = match &args.output {
        Some(path) => PathBuf::from(path),
        None => default_bundle_path(&ctx.config.export.resolve_dir(&ctx.project_root)),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tables = (!args.tables.is_empty()).then_some(args.tables.as_slice());
    let progress = Progress::spinner("Exporting database");
    let manifest = match ctx.service.export_bundle(&path, tables).await {
        Ok(manifest) => manifest,
        Err(error) => {
            progress.finish_err("Export failed");
            return Err(error).with_context(|| format!("failed to export to {}", path.display()));
        }
    };
    let rows: u64 = manifest.tables.iter().map(|table| table.rows).sum();
    progress.finish_ok(&format!("Exported {rows} rows"));
    tracing::info!(path = %path.display(), rows, "bundle written");

    output(
        &ExportResponse {
            path: path.display().to_string(),
            manifest,
        },
        flags.format,
    )
}

fn default_bundle_path(dir: &Path) -> PathBuf {
    dir.join(format!("sprig-{}.tar.gz", Utc::now().format("%Y%m%dT%H%M%SZ")))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::default_bundle_path;

    #[test]
    fn default_path_is_timestamped_archive() {
        let path = default_bundle_path(Path::new("/farm/.sprig/exports"));
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name");
        assert!(path.starts_with("/farm/.sprig/exports"));
        assert!(name.starts_with("sprig-"));
        assert!(name.ends_with("Z.tar.gz"));
    }
}
