use arch::mem::{MemoryImage, MemoryLayout, Segment};
use color_print::{ceprintln, cprintln};
use mipsasm::{dump, Assembler, Settings, Source};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input files, assembled in order as one program
    #[clap(default_value = "main.s")]
    input: Vec<String>,

    /// Output file for the .text image
    #[clap(short, long, default_value = "main.text.bin")]
    output: String,

    /// Output file for the .data image
    #[clap(long)]
    data: Option<String>,

    /// Settings file (YAML)
    #[clap(short, long)]
    config: Option<String>,

    /// Treat warnings as errors
    #[clap(long)]
    werror: bool,

    /// Only accept numeric register names ($8, not $t0)
    #[clap(long)]
    strict: bool,

    /// Dump assembly listing
    #[clap(short, long)]
    dump: bool,

    /// Write the label table (YAML)
    #[clap(long)]
    symbols: Option<String>,

    /// More logging (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn fail(msg: String) -> ! {
    ceprintln!("<r,s>{}</>", msg);
    std::process::exit(1)
}

/// Bytes from `base` up to the end of the last thing written in `[base, limit]`.
fn image(mem: &MemoryImage, ends: impl Iterator<Item = u32>, base: u32) -> Vec<u8> {
    let end = ends.max().unwrap_or(base);
    mem.read_bytes(base, end.saturating_sub(base) as usize)
}

fn main() {
    use clap::Parser;

    let args: Args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("logger: {}", e);
    }

    println!("MIPS32 Assembler");

    let mut settings = match &args.config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| fail(e)),
        None => Settings::default(),
    };
    settings.warnings_are_errors |= args.werror;
    settings.extended &= !args.strict;

    println!("1. Read Files");
    let mut sources = vec![];
    for path in &args.input {
        println!("  < {}", path);
        match Source::read(path) {
            Ok(source) => sources.push(source),
            Err(diag) => {
                diag.print_diag();
                std::process::exit(1);
            }
        }
    }

    println!("2. Assemble");
    let layout: MemoryLayout = settings.layout.clone();
    let mut mem = MemoryImage::new(layout.clone());
    let assembly = match Assembler::new(settings).assemble(&sources, &mut mem) {
        Ok(assembly) => assembly,
        Err(diags) => {
            diags.print_diag();
            cprintln!("<r,s>Assembly failed</>: {} error(s)", diags.errors().count());
            std::process::exit(1);
        }
    };
    assembly.diagnostics.print_diag();

    println!("3. Write Images");
    let ends = assembly
        .program
        .text
        .keys()
        .filter(|addr| layout.contains(Segment::Text, **addr))
        .map(|addr| addr + 4);
    let text = image(&mem, ends, layout.text_base);
    println!("  > {} ({} bytes)", &args.output, text.len());
    std::fs::write(&args.output, &text)
        .unwrap_or_else(|e| fail(format!("Failed to write {}: {}", args.output, e)));

    if let Some(path) = &args.data {
        let ends = assembly
            .program
            .data
            .iter()
            .filter(|(addr, _)| layout.contains(Segment::Data, **addr))
            .map(|(addr, data)| addr + data.size());
        let data = image(&mem, ends, layout.data_base);
        println!("  > {} ({} bytes)", path, data.len());
        std::fs::write(path, &data)
            .unwrap_or_else(|e| fail(format!("Failed to write {}: {}", path, e)));
    }

    if let Some(path) = &args.symbols {
        println!("  > {}", path);
        let yaml = serde_yaml::to_string(&assembly.program.labels)
            .unwrap_or_else(|e| fail(format!("Failed to serialize labels: {}", e)));
        std::fs::write(path, yaml)
            .unwrap_or_else(|e| fail(format!("Failed to write {}: {}", path, e)));
    }

    if args.dump {
        dump::print_dump(&assembly, &mem);
    }
}
