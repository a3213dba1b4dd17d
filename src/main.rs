use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use regvm::bytecode::Image;
use regvm::bytecode::disasm::print_image;
use regvm::frontend::Unit;
use regvm::frontend::dump::proc_dump;
use regvm::frontend::lexer::scan;
use regvm::frontend::parser::parse;
use regvm::frontend::token_dumper::TokenDumper;
use regvm::runtime::registers::IP;
use regvm::runtime::{Vm, VmConfig};
use regvm::{AssembleError, assemble};

const IMAGE_EXT: &str = "rvm";

#[derive(Parser, Debug)]
#[command(name = "regvm")]
#[command(about = "Assembler and VM for typed-register machine programs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the token stream of a source file
    Tokens {
        file: PathBuf,

        #[arg(long)]
        no_color: bool,

        /// Show canonical keyword names instead of token debug forms
        #[arg(long)]
        pretty: bool,
    },

    /// Parse a source file and print it in canonical form
    Dump { file: PathBuf },

    /// Assemble a source file into a bytecode image
    Build {
        file: PathBuf,

        /// Output path (defaults to the input with a .rvm extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a source file or a built image
    Run {
        file: PathBuf,

        /// Give up after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// Procedure to start in (defaults to the first one)
        #[arg(long)]
        entry: Option<String>,
    },

    /// Disassemble a source file or a built image
    Disasm { file: PathBuf },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    match args.command {
        Command::Tokens {
            file,
            no_color,
            pretty,
        } => dump_tokens(&file, no_color, pretty),
        Command::Dump { file } => dump_procs(&file),
        Command::Build { file, output } => build(&file, output),
        Command::Run {
            file,
            max_steps,
            entry,
        } => run(&file, max_steps, entry.as_deref()),
        Command::Disasm { file } => print_image(&load_image(&file)),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{}", message);
    process::exit(1);
}

fn read_unit(path: &Path) -> Unit {
    match fs::read_to_string(path) {
        Ok(source) => Unit::new(path.display().to_string(), source),
        Err(e) => fail(format!("Failed to read '{}': {}", path.display(), e)),
    }
}

fn report(unit: &Unit) -> ! {
    fail(unit.render_diagnostics().trim_end())
}

fn dump_tokens(path: &Path, no_color: bool, pretty: bool) {
    let mut unit = read_unit(path);
    let ok = scan(&mut unit);

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }
    dumper.dump(&unit);

    if !ok {
        report(&unit);
    }
}

fn dump_procs(path: &Path) {
    let mut unit = read_unit(path);
    if !scan(&mut unit) || !parse(&mut unit) {
        report(&unit);
    }
    print!("{}", proc_dump(&unit));
}

/// Assembles a source file, reporting any failure and exiting.
fn assemble_file(path: &Path) -> Image {
    let mut unit = read_unit(path);
    match assemble(&mut unit) {
        Ok(image) => image,
        Err(AssembleError::Syntax { .. }) => report(&unit),
        Err(e) => fail(format!("{}: {}", unit.path, e)),
    }
}

/// Loads a built image, or assembles source on the fly.
fn load_image(path: &Path) -> Image {
    if path.extension().and_then(|e| e.to_str()) == Some(IMAGE_EXT) {
        match Image::load(path) {
            Ok(image) => image,
            Err(e) => fail(format!("Failed to load '{}': {}", path.display(), e)),
        }
    } else {
        assemble_file(path)
    }
}

fn build(path: &Path, output: Option<PathBuf>) {
    let image = assemble_file(path);
    let output = output.unwrap_or_else(|| path.with_extension(IMAGE_EXT));

    if let Err(e) = image.save(&output) {
        fail(format!("Failed to write '{}': {}", output.display(), e));
    }

    info!(
        bytes = image.code.len(),
        procs = image.procs.len(),
        "Wrote image to {}",
        output.display()
    );
}

fn run(path: &Path, max_steps: Option<u64>, entry: Option<&str>) {
    let image = load_image(path);

    let start = match entry {
        Some(name) => match image.entry(name) {
            Some(offset) => offset,
            None => fail(format!("No procedure named '{}'", name)),
        },
        None => image.procs.first().map_or(0, |p| p.offset),
    };

    let mut vm = Vm::with_config(VmConfig { max_steps });
    vm.set_ip(start);

    let result = vm.run(&image.code);

    for (i, cell) in vm.registers().cells().iter().enumerate() {
        let name = if i == IP {
            "ip".to_string()
        } else {
            format!("r{}", i)
        };
        println!("{:<3} {:#018x}  {}", name, cell.u64(), cell.i64());
    }
    println!("flag {:?}", vm.flag());

    match result {
        Ok(steps) => info!(steps, "Halted"),
        Err(e) => fail(e),
    }
}
