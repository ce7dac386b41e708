use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

use enum_codegen::analyzer::extract::analyze_file;
use enum_codegen::build::{cached_output_files, find_all_source_files};
use enum_codegen::cache::OutputCache;
use enum_codegen::emit::{Emitter, JsonEmitter, ReflectionEmitter};
use enum_codegen::libclang::ClangParser;
use enum_codegen::{
    generate, get_output_files, run_batch, BatchRegen, Build, CodegenConfig, CodegenError,
    CompileEnvironment,
};

#[derive(Parser)]
#[command(author, version, about = "Enum reflection code generator for C++", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the reflection source for one file
    Generate(FileArgs),
    /// Print the files `generate` would write for one file, `;`-separated
    GetOutputFiles(OutputArgs),
    /// Like get-output-files, but answer from the cache when it is current
    QueryOutputs(QueryArgs),
    /// Regenerate every stale file and write an aggregate source including them
    Batch(BatchArgs),
    /// Print the enums and forward declarations found in one file as JSON
    Inspect(FileArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to the libclang library file
    #[arg(long = "libclangpath")]
    libclang_path: PathBuf,
    /// Add an include path
    #[arg(long = "include", short = 'I')]
    include_paths: Vec<PathBuf>,
    /// Root path of all source files
    #[arg(long)]
    source_root: PathBuf,
}

#[derive(Args, Debug)]
struct FileArgs {
    /// Source file to analyze
    source_file: PathBuf,
    #[command(flatten)]
    common: CommonArgs,
    /// Root path of all generated files
    #[arg(long)]
    output_root: PathBuf,
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[command(flatten)]
    file: FileArgs,
    /// Directory to store output file caches in
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    file: FileArgs,
    /// Directory holding output file caches
    #[arg(long)]
    cache_path: PathBuf,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Source files; every C++ file under the source root when omitted
    source_files: Vec<PathBuf>,
    #[command(flatten)]
    common: CommonArgs,
    /// Aggregate source file to write
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
    /// Root path of generated files (defaults to the aggregate's directory)
    #[arg(long)]
    output_root: Option<PathBuf>,
    /// Regenerate every file regardless of timestamps
    #[arg(long)]
    full: bool,
    /// Directory to keep per-file output records in, so files without enums
    /// are not re-parsed on every run
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

/// Validated configuration plus the parser it names. Configuration errors are
/// reported before libclang is loaded.
fn setup(common: &CommonArgs, output_root: &Path) -> Result<(CodegenConfig, ClangParser), CodegenError> {
    let config = CodegenConfig {
        parser_library: common.libclang_path.clone(),
        source_root: common.source_root.clone(),
        output_root: output_root.to_path_buf(),
        environment: CompileEnvironment::new(common.include_paths.iter().cloned()),
    };
    config.validate()?;
    let parser = ClangParser::new(&config.parser_library)?;
    Ok((config, parser))
}

fn join_outputs(outputs: &[PathBuf]) -> String {
    outputs
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn run(command: Commands) -> Result<(), CodegenError> {
    match command {
        Commands::Generate(args) => {
            let (config, parser) = setup(&args.common, &args.output_root)?;
            generate(&args.source_file, &config, &parser, &ReflectionEmitter::default())?;
        }
        Commands::GetOutputFiles(args) => {
            let (config, parser) = setup(&args.file.common, &args.file.output_root)?;
            let outputs = get_output_files(
                &args.file.source_file,
                &config,
                &parser,
                args.cache_path.as_deref(),
            )?;
            print!("{}", join_outputs(&outputs));
        }
        Commands::QueryOutputs(args) => {
            let (config, parser) = setup(&args.file.common, &args.file.output_root)?;
            let cache = OutputCache::new(&args.cache_path, &config.source_root);
            let outputs = cached_output_files(&args.file.source_file, &config, &parser, &cache)?;
            print!("{}", join_outputs(&outputs));
        }
        Commands::Batch(args) => {
            let output_root = args.output_root.clone().unwrap_or_else(|| {
                args.output
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            });
            let (config, parser) = setup(&args.common, &output_root)?;
            let emitter = ReflectionEmitter::default();
            let build = Build::new(&config, &parser, &emitter)?;

            let files = if args.source_files.is_empty() {
                find_all_source_files(&config.source_root)
            } else {
                // the aggregate may be handed back to us as an input
                args.source_files
                    .into_iter()
                    .filter(|f| *f != args.output)
                    .collect()
            };
            let mut strategy = BatchRegen::new(&args.output, args.full);
            if let Some(cache_path) = &args.cache_path {
                strategy = strategy.with_records(OutputCache::new(cache_path, &config.source_root));
            }
            run_batch(&files, &args.output, &strategy, &build)?;
        }
        Commands::Inspect(args) => {
            let (config, parser) = setup(&args.common, &args.output_root)?;
            let source = analyze_file(&parser, &args.source_file, &config.environment)?;
            let json = JsonEmitter.render(
                &source.enums,
                source.path(),
                &source.forward_declares.children,
            )?;
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
