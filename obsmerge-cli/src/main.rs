mod reports;
mod tools;
mod util;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use obsmerge_core::{MergeOptions, Observation, PresetCombiner, merge_observations};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write, stdin, stdout};
use std::path::{Path, PathBuf};

use reports::{generate_console_report, generate_json_report, generate_markdown_report};
use tools::interleave::log_label;
use tools::{interleave_logs, select_path, write_features_csv, write_indented};
use util::{read_json, run_labels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Report JSON, one line unless `--pretty`
    Json,
    /// Coloured summary for terminals
    Console,
    /// Markdown tables
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "obsmerge", version)]
#[command(about = "Merge, project and inspect simulation observation files")]
struct Args {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge observations into one aggregate report
    Merge(MergeArgs),
    /// Combine observations from differently configured runs into one labelled document
    Presets(PresetsArgs),
    /// Flatten the features of observation or report files into CSV
    Csv(CsvArgs),
    /// Print the part of a JSON document found by walking a path
    Select(SelectArgs),
    /// Interleave simulation logs by timestamp
    Interleave(InterleaveArgs),
}

#[derive(Debug, ClapArgs)]
struct OutputArgs {
    /// Output file (defaults to stdout)
    #[arg(short = 'o', long = "output", visible_short_alias = 'f', visible_alias = "file")]
    output: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
struct OptionsArgs {
    /// JSON file overriding the reserved observation keys
    #[arg(long = "options")]
    options: Option<PathBuf>,
}

impl OptionsArgs {
    fn load(&self) -> Result<MergeOptions> {
        let Some(path) = &self.options else {
            return Ok(MergeOptions::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options {}", path.display()))?;
        MergeOptions::from_json(&text)
            .with_context(|| format!("invalid options in {}", path.display()))
    }
}

#[derive(Debug, ClapArgs)]
struct MergeArgs {
    /// Observation files, merged in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    report: ReportFormat,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    options: OptionsArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, ClapArgs)]
struct PresetsArgs {
    /// Observation files, one or more per preset directory
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    options: OptionsArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, ClapArgs)]
struct CsvArgs {
    /// Observation or report files, one row each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    options: OptionsArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, ClapArgs)]
struct SelectArgs {
    /// Path segments: object keys or array indices
    fields: Vec<String>,

    /// JSON document to read (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, ClapArgs)]
struct InterleaveArgs {
    /// Log files to interleave
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Merge(merge) => run_merge(&merge),
        Command::Presets(presets) => run_presets(&presets),
        Command::Csv(csv) => run_csv(&csv),
        Command::Select(select) => run_select(&select),
        Command::Interleave(interleave) => run_interleave(&interleave),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

fn read_observation(path: &Path, options: &MergeOptions) -> Result<Observation> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Observation::from_reader(BufReader::new(file), options)
        .with_context(|| format!("malformed observation {}", path.display()))
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let options = args.options.load()?;
    log::info!("merging {} observation files", args.files.len());
    let observations = args
        .files
        .iter()
        .map(|path| read_observation(path, &options));
    let report = merge_observations(observations, options.clone())?;

    // Nothing is written until the merge has succeeded.
    let mut output_target = OutputTarget::new(args.output.output.clone())?;
    match args.report {
        ReportFormat::Json => generate_json_report(&mut output_target, &report, args.pretty)?,
        ReportFormat::Console => {
            generate_console_report(&mut output_target, &report, args.files.len())?;
        }
        ReportFormat::Markdown => generate_markdown_report(&mut output_target, &report)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn run_presets(args: &PresetsArgs) -> Result<()> {
    let options = args.options.load()?;
    let labels = run_labels(&args.files)?;
    let mut combiner = PresetCombiner::new(options);
    for (path, label) in args.files.iter().zip(&labels) {
        let observation = read_json(path)?;
        combiner
            .add(label, observation)
            .with_context(|| format!("cannot combine {}", path.display()))?;
    }
    let combined = combiner.finish();

    let mut output_target = OutputTarget::new(args.output.output.clone())?;
    generate_json_report(&mut output_target, &combined, args.pretty)?;
    output_target.flush_inner()?;
    Ok(())
}

fn run_csv(args: &CsvArgs) -> Result<()> {
    let options = args.options.load()?;
    let mut rows = Vec::new();
    write_features_csv(&mut rows, &args.files, &options.config_key)?;

    let mut output_target = OutputTarget::new(args.output.output.clone())?;
    output_target.write_all(&rows)?;
    output_target.flush_inner()?;
    Ok(())
}

fn run_select(args: &SelectArgs) -> Result<()> {
    let document: serde_json::Value = match &args.input {
        Some(path) => read_json(path)?,
        None => {
            let mut text = String::new();
            stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            serde_json::from_str(&text).context("failed to parse JSON from stdin")?
        }
    };
    let selected = select_path(&document, &args.fields)?;

    let mut output_target = OutputTarget::new(args.output.output.clone())?;
    write_indented(&mut output_target, selected)?;
    output_target.flush_inner()?;
    Ok(())
}

fn run_interleave(args: &InterleaveArgs) -> Result<()> {
    let labels = run_labels(&args.files)?;
    let logs = args
        .files
        .iter()
        .zip(labels)
        .map(|(path, label)| {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok((log_label(&label).to_string(), BufReader::new(file)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut output_target = OutputTarget::new(args.output.output.clone())?;
    interleave_logs(&mut output_target, logs)?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
