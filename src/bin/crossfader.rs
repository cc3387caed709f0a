use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crossfader::{
    BatchMonitor, CrossfadeConfig, Crossfader, ImageFileWriter, JobEvent, ResizeFilter,
    SourcePair,
};

#[derive(Parser, Debug)]
#[command(name = "crossfader", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blend two images into a numbered sequence of intermediate frames.
    Generate(GenerateArgs),
    /// Print the file-dialog filter for the image formats that can be read and written.
    Formats,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// First image (the sequence starts near this one).
    #[arg(long)]
    first: Option<PathBuf>,

    /// Last image (the sequence ends near this one).
    #[arg(long)]
    last: Option<PathBuf>,

    /// Directory the frames are written to.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// File name prefix, followed by a two-digit frame number.
    #[arg(long)]
    base_name: Option<String>,

    /// Number of intermediate frames.
    #[arg(long)]
    count: Option<u32>,

    /// Output extension; selects the encoder.
    #[arg(long = "ext")]
    extension: Option<String>,

    /// Resampling filter used to bring both images to a common size.
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<FilterChoice> for ResizeFilter {
    fn from(c: FilterChoice) -> Self {
        match c {
            FilterChoice::Nearest => ResizeFilter::Nearest,
            FilterChoice::Triangle => ResizeFilter::Triangle,
            FilterChoice::CatmullRom => ResizeFilter::CatmullRom,
            FilterChoice::Gaussian => ResizeFilter::Gaussian,
            FilterChoice::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Formats => cmd_formats(),
    }
}

fn resolve_config(args: GenerateArgs) -> anyhow::Result<CrossfadeConfig> {
    let mut cfg = match &args.config {
        Some(path) => CrossfadeConfig::from_json_path(path)?,
        None => CrossfadeConfig::default(),
    };

    if args.first.is_some() {
        cfg.first = args.first;
    }
    if args.last.is_some() {
        cfg.last = args.last;
    }
    if let Some(dir) = args.out_dir {
        cfg.out_dir = dir;
    }
    if let Some(base) = args.base_name {
        cfg.base_name = base;
    }
    if let Some(count) = args.count {
        cfg.count = count;
    }
    if let Some(ext) = args.extension {
        cfg.extension = ext;
    }
    if let Some(filter) = args.filter {
        cfg.filter = filter.into();
    }

    cfg.validate()?;
    Ok(cfg)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(args)?;
    let request = cfg.batch_request()?;

    let (first_path, last_path) = cfg
        .first
        .as_deref()
        .zip(cfg.last.as_deref())
        .context("both --first and --last are required")?;
    let first = crossfader::load_image(first_path)?;
    let last = crossfader::load_image(last_path)?;
    let sources = SourcePair::prepare(&first, &last, cfg.filter)?;

    let (width, height) = sources.dimensions();
    eprintln!(
        "generating {} frames at {width}x{height} into {}",
        request.count,
        request.output.dir().display()
    );

    let mut fader = Crossfader::new(Arc::new(ImageFileWriter));
    let (rx, expected) = fader.generate(&request, &sources)?;

    let report = BatchMonitor::new(rx, expected).run(|event| match event {
        JobEvent::Progress { filename, percent } => {
            tracing::trace!(%filename, percent, "progress");
        }
        JobEvent::Saving { filename } => eprintln!("saving '{filename}'"),
        JobEvent::Saved { filename, ok: true } => eprintln!("saved '{filename}'"),
        JobEvent::Saved {
            filename,
            ok: false,
        } => eprintln!("failed to save '{filename}'"),
        JobEvent::Done { .. } => {}
    });
    fader.cancel();

    if report.cancelled {
        eprintln!("canceled");
    } else {
        eprintln!("finished");
    }
    if !report.failed.is_empty() {
        anyhow::bail!("{} of {} frames failed to save", report.failed.len(), expected);
    }
    Ok(())
}

fn cmd_formats() -> anyhow::Result<()> {
    let exts = crossfader::supported_extensions();
    println!("{}", crossfader::filename_filter("Images", &exts));
    Ok(())
}
