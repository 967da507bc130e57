//! Processor setup: config overrides and the options record.

use anyhow::Context;
use pixelveil_core::{Action, Config, OutputFormat as CoreOutputFormat, ProcessOptions};

use super::{ProcessArgs, ProcessContext};

/// Validate input, apply CLI overrides, and assemble everything needed for
/// processing.
pub fn setup_processor(args: &ProcessArgs, mut config: Config) -> anyhow::Result<ProcessContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = parallel;
    }

    let options = build_options(args)?;

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => config.output_dir(),
    };

    let report_format = match args.format {
        Some(format) => format.into(),
        None => CoreOutputFormat::parse(&config.output.format).unwrap_or(CoreOutputFormat::Json),
    };
    let pretty = args.pretty || config.output.pretty;

    Ok(ProcessContext {
        config,
        options,
        output_dir,
        report_format,
        pretty,
    })
}

/// Build the options record: the JSON file (if any) first, then flags.
pub fn build_options(args: &ProcessArgs) -> anyhow::Result<ProcessOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {:?}", path))?;
            serde_json::from_str::<ProcessOptions>(&content)
                .with_context(|| format!("Invalid options file {:?}", path))?
        }
        None => ProcessOptions::default(),
    };

    if let Some(action) = args.action {
        options.action = action.into();
    }
    if let Some(kind) = args.scramble_type {
        options.scramble_type = Some(kind.into());
        if args.action.is_none() {
            options.action = Action::Scramble;
        }
    }

    override_string(&mut options.copyright, &args.copyright);
    override_string(&mut options.author, &args.author);
    override_string(&mut options.image_description, &args.description);
    override_string(&mut options.make, &args.make);
    override_string(&mut options.model, &args.model);
    override_string(&mut options.software, &args.software);
    override_string(&mut options.host_computer, &args.host_computer);
    override_string(&mut options.watermark_text, &args.watermark_text);

    options.remove_gps |= args.remove_gps;
    options.keep_color_profile |= args.keep_color_profile;
    // --max-width alone implies optimization
    options.optimize |= args.optimize || args.max_width.is_some();
    if args.max_width.is_some() {
        options.max_width = args.max_width;
    }
    if args.quality.is_some() {
        options.quality = args.quality;
    }
    if args.intensity.is_some() {
        options.scramble_intensity = args.intensity;
    }
    if let Some(position) = args.watermark_position {
        options.watermark_position = position.into();
    }

    options
        .validate()
        .map_err(|e| anyhow::anyhow!("{e}\n\n  Hint: run `pixelveil process --help` for valid flags."))?;

    Ok(options)
}

fn override_string(field: &mut Option<String>, flag: &Option<String>) {
    if flag.is_some() {
        field.clone_from(flag);
    }
}
