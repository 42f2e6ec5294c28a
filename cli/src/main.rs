use anyhow::Context;
use clap::{Parser, Subcommand};
use fatscope_fs::Image;
use log::{debug, LevelFilter};
use std::io::{self, Write};
use std::path::PathBuf;

mod render;
mod shell;

#[derive(Parser)]
#[command(name = "fatscope")]
#[command(about = "Read-only explorer for FAT12/16/32 disk images", long_about = None)]
struct Cli {
    /// Path of the disk image
    image: PathBuf,

    /// Print JSON instead of text where supported (ls, info, geometry)
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the children of a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show the hierarchy below an entry
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show name, attributes, timestamps and size of an entry
    Info {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Write a file's content to stdout
    Cat { path: String },
    /// One-line short metadata of an entry
    Meta { path: String },
    /// Show the volume geometry derived from the boot sector
    Geometry,
    /// Browse the image interactively
    Shell,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut image = Image::open(&cli.image)
        .with_context(|| format!("Failed to open {}", cli.image.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = run(&mut image, cli.command, cli.json, &mut out);
    out.flush()?;

    let closed = image.close();
    debug!("Released {} entries and {} files", closed.entries, closed.files);
    result
}

fn run(image: &mut Image, command: Commands, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Ls { path } => {
            let entry = image.open_entry(&path).with_context(|| format!("ls {}", path))?;
            let listed = render::print_children(image, entry, json, out);
            image.close_entry(entry)?;
            listed
        }
        Commands::Tree { path } => {
            let entry = image.open_entry(&path).with_context(|| format!("tree {}", path))?;
            let printed = render::print_tree(image, entry, out);
            image.close_entry(entry)?;
            printed
        }
        Commands::Info { path } => {
            let entry = image.open_entry(&path).with_context(|| format!("info {}", path))?;
            let printed = render::print_info(image.entry(entry)?, json, out);
            image.close_entry(entry)?;
            printed
        }
        Commands::Cat { path } => {
            let entry = image.open_entry(&path).with_context(|| format!("cat {}", path))?;
            let copied = render::print_data(image, entry, out);
            image.close_entry(entry)?;
            copied
        }
        Commands::Meta { path } => {
            let entry = image.open_entry(&path).with_context(|| format!("meta {}", path))?;
            writeln!(out, "{}", render::meta_line(image.entry(entry)?))?;
            image.close_entry(entry)?;
            Ok(())
        }
        Commands::Geometry => render::print_geometry(image.geometry(), json, out),
        Commands::Shell => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            shell::Shell::new(image, json)?.run(&mut input, out)
        }
    }
}
