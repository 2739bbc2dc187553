use anyhow::{bail, Context, Result};
use chartpipe::csv_reader;
use chartpipe::dashboard::Dashboard;
use chartpipe::data::Table;
use chartpipe::pipeline::ChartPipeline;
use chartpipe::presets::{self, PRESETS};
use chartpipe::render::render;
use chartpipe::view::Status;
use chartpipe::{OutputFormat, RenderOptions};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartpipe")]
#[command(about = "Turn CSV data into charts with a pipeline DSL", long_about = None)]
struct Cli {
    /// More logging on stderr (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one chart to PNG or SVG
    Render {
        #[command(flatten)]
        chart: ChartArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
        format: OutputFormat,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the aggregated chart data as JSON
    Aggregate {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Render every chart of a dashboard config into a directory
    Dashboard {
        config: PathBuf,
        #[arg(long, default_value = "charts")]
        out_dir: PathBuf,
        /// Category to select on producer charts before writing
        #[arg(long)]
        select: Option<String>,
    },
    /// List built-in pipelines
    Presets,
}

#[derive(Args, Debug)]
struct ChartArgs {
    /// Pipeline DSL string (e.g., 'fields(color: text) | bar(x: color)')
    #[arg(required_unless_present = "preset", conflicts_with = "preset")]
    dsl: Option<String>,
    /// Use a built-in pipeline instead of a DSL string
    #[arg(short, long)]
    preset: Option<String>,
    /// CSV file; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Category to filter on, for pipelines with a select(...) stage
    #[arg(long)]
    select: Option<String>,
}

impl ChartArgs {
    fn pipeline(&self) -> Result<ChartPipeline> {
        match (&self.dsl, &self.preset) {
            (Some(dsl), _) => ChartPipeline::from_dsl(dsl).context("Failed to parse pipeline"),
            (None, Some(name)) => presets::pipeline(name).context("Failed to load preset"),
            (None, None) => bail!("Either a pipeline string or --preset is required"),
        }
    }

    fn table(&self) -> Result<Table> {
        match &self.input {
            Some(path) => csv_reader::read_csv_from_path(path)
                .with_context(|| format!("Failed to read CSV from {}", path.display())),
            None => csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin"),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "chartpipe=info",
        1 => "chartpipe=debug",
        _ => "chartpipe=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn write_output(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write chart to stdout")?;
            handle.flush().context("Failed to flush stdout")
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Render { chart, format, width, height, output } => {
            let pipeline = chart.pipeline()?;
            let table = chart.table()?;
            let data = pipeline
                .run(&table, chart.select.as_deref())
                .context("Failed to compute chart")?;
            let options = RenderOptions { width, height, format };
            let rendered = render(&data, &options).context("Failed to render chart")?;
            write_output(&rendered.bytes, output.as_deref())?;
        }
        Command::Aggregate { chart } => {
            let pipeline = chart.pipeline()?;
            let table = chart.table()?;
            let data = pipeline
                .run(&table, chart.select.as_deref())
                .context("Failed to compute chart")?;
            let json = serde_json::to_string_pretty(&data).context("Failed to serialize chart data")?;
            println!("{}", json);
        }
        Command::Dashboard { config, out_dir, select } => {
            let mut dashboard = Dashboard::from_path(&config)
                .with_context(|| format!("Failed to load dashboard {}", config.display()))?;
            dashboard.start();
            dashboard.wait();
            if let Some(category) = select {
                dashboard.select(&category);
            }
            let written = dashboard.write_frames(&out_dir).context("Failed to write charts")?;
            for (id, role, status) in dashboard.summary() {
                match status {
                    Status::Failed(msg) => eprintln!("{:<24} {:<10} failed: {}", id, format!("{:?}", role), msg),
                    status => eprintln!("{:<24} {:<10} {:?}", id, format!("{:?}", role), status),
                }
            }
            eprintln!("Wrote {} chart(s) to {}", written.len(), out_dir.display());
        }
        Command::Presets => {
            for preset in PRESETS {
                println!("{:<24} {:<32} {}", preset.name, preset.dataset, preset.description);
            }
        }
    }

    Ok(())
}
