//! Batch processing: progress, cancellation, report output and summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use pixelveil_core::pipeline::DiscoveredFile;
use pixelveil_core::{
    BatchCoordinator, BatchInput, BatchItem, BatchOptions, BatchSummary, FsSink, FsSource,
    ImageProcessor, OutputWriter, ProcessResult,
};

use super::{ProcessArgs, ProcessContext};

/// Process discovered images through the batch coordinator and write the
/// report.
pub async fn run_batch(
    ctx: ProcessContext,
    args: &ProcessArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&ctx.output_dir)?;

    let mut batch_options = BatchOptions::from_config(&ctx.config);
    batch_options.seed = args.seed;

    let coordinator = BatchCoordinator::new(ImageProcessor::new(&ctx.config), batch_options)
        .with_source(FsSource::new())
        .with_sink(FsSink::new(&ctx.output_dir));

    // Ctrl-C stops submission; running images finish
    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted - finishing running images, skipping the rest");
            cancel.cancel();
        }
    });

    let items = build_items(&files, &ctx);

    let progress = create_progress_bar(items.len() as u64);
    let start_time = Instant::now();
    let results = {
        let progress = progress.clone();
        coordinator
            .process_batch_with(items, move |result| {
                progress.inc(1);
                let elapsed = start_time.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    let rate = progress.position() as f64 / elapsed;
                    progress.set_message(format!("{:.1} img/sec", rate));
                }
                if !result.success {
                    progress.println(format!(
                        "  failed: {} - {}",
                        result.image_id,
                        result.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            })
            .await
    };
    let elapsed = start_time.elapsed();
    progress.finish_and_clear();

    let summary = BatchSummary::from_results(&results, elapsed);
    write_report(args, &ctx, &results, &summary)?;
    print_summary(&results, &summary, &ctx);

    Ok(())
}

/// One batch item per discovered file, fetched by path.
fn build_items(files: &[DiscoveredFile], ctx: &ProcessContext) -> Vec<BatchItem> {
    files
        .iter()
        .map(|file| {
            BatchItem::new(
                file.id.clone(),
                BatchInput::Fetch(file.path.to_string_lossy().into_owned()),
                ctx.options.clone(),
            )
        })
        .collect()
}

/// Write the report to `--report` or stdout.
fn write_report(
    args: &ProcessArgs,
    ctx: &ProcessContext,
    results: &[ProcessResult],
    summary: &BatchSummary,
) -> anyhow::Result<()> {
    let sink: Box<dyn Write> = match &args.report {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = OutputWriter::new(sink, ctx.report_format, ctx.pretty);
    for result in results {
        writer.write_result(result)?;
    }
    writer.finish(summary)?;

    if let Some(path) = &args.report {
        tracing::info!("Report written to {:?}", path);
    }
    Ok(())
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(results: &[ProcessResult], summary: &BatchSummary, ctx: &ProcessContext) {
    let warned = results
        .iter()
        .filter(|r| {
            r.success
                && r.message
                    .as_deref()
                    .is_some_and(|m| m.starts_with("Processed with warnings"))
        })
        .count();

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if warned > 0 {
        eprintln!("    With warnings:{:>8}", warned);
    }
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", results.len());
    eprintln!("    Duration:     {:>7.1}s", summary.total_seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", summary.images_per_second);
    eprintln!("    Output:       {}", ctx.output_dir.display());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelveil_core::{Action, Config, OutputFormat, ProcessOptions};
    use std::path::PathBuf;

    fn context(dir: PathBuf) -> ProcessContext {
        ProcessContext {
            config: Config::default(),
            options: ProcessOptions::for_action(Action::Strip),
            output_dir: dir,
            report_format: OutputFormat::Json,
            pretty: false,
        }
    }

    #[test]
    fn test_build_items_keeps_discovery_order_and_ids() {
        let files = vec![
            DiscoveredFile {
                path: PathBuf::from("/in/a.jpg"),
                id: "a.jpg".into(),
                size: 1,
            },
            DiscoveredFile {
                path: PathBuf::from("/in/sub/b.png"),
                id: "sub/b.png".into(),
                size: 2,
            },
        ];
        let items = build_items(&files, &context(PathBuf::from("/out")));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "sub/b.png");
        assert!(matches!(&items[1].input, BatchInput::Fetch(p) if p == "/in/sub/b.png"));
        assert_eq!(items[0].options.action, Action::Strip);
    }

    #[tokio::test]
    async fn test_run_batch_writes_outputs_and_report() {
        use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([5, 6, 7])));
        image
            .save_with_format(input.path().join("ok.png"), ImageFormat::Png)
            .unwrap();
        std::fs::write(input.path().join("bad.jpg"), b"\xFF\xD8\xFFgarbage").unwrap();

        let report = output.path().join("report.json");
        let args = ProcessArgs {
            input: input.path().to_path_buf(),
            report: Some(report.clone()),
            ..Default::default()
        };
        let ctx = context(output.path().join("images"));
        let files = pixelveil_core::pipeline::FileDiscovery::new(ctx.config.processing.clone())
            .discover(input.path());

        run_batch(ctx, &args, files).await.unwrap();

        assert!(output.path().join("images/ok.png").exists());
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(parsed["summary"]["succeeded"], 1);
        assert_eq!(parsed["summary"]["failed"], 1);
        assert_eq!(parsed["results"][0]["imageId"], "bad.jpg");
    }
}
