//! The `pixelveil inspect` command: print an image's container and EXIF
//! summary as JSON.

use clap::Args;
use pixelveil_core::pipeline::format_to_string;
use pixelveil_core::{read_metadata, ExifSummary, ImageBuffer};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Image file to inspect
    #[arg(required = true)]
    pub input: PathBuf,

    /// Single-line JSON output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    file: String,
    format: String,
    width: u32,
    height: u32,
    has_alpha: bool,
    file_size: usize,
    has_icc_profile: bool,
    exif: Option<ExifSummary>,
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&args.input).await.map_err(|e| {
        anyhow::anyhow!("Failed to read {:?}: {e}", args.input)
    })?;
    let report = inspect(&args.input, bytes)?;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);
    Ok(())
}

fn inspect(path: &std::path::Path, bytes: Vec<u8>) -> anyhow::Result<InspectReport> {
    let image = ImageBuffer::from_bytes(bytes)?;
    let exif = match read_metadata(&image) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::warn!("Unreadable EXIF in {:?}: {e}", path);
            None
        }
    };

    Ok(InspectReport {
        file: path.display().to_string(),
        format: format_to_string(image.format()),
        width: image.width(),
        height: image.height(),
        has_alpha: image.has_alpha(),
        file_size: image.len(),
        has_icc_profile: image.info().icc_profile.is_some(),
        exif,
    })
}
