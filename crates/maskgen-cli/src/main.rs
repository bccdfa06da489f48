//! `maskgen`: assemble a mask recipe into a GDS-II library and an SVG
//! preview of its top cell.

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use tempfile::NamedTempFile;

use maskgen_io::{assemble, write_svg, GdsWriter, Recipe};

#[derive(Parser)]
#[command(name = "maskgen")]
#[command(about = "Build lithography test-mask layouts from a recipe")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the mask and write <name>.gds and <name>.svg
    Build {
        /// Recipe JSON; the reference mask is used when omitted
        #[arg(short, long)]
        recipe: Option<PathBuf>,

        /// Directory the output files are written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Output file stem (defaults to the library name)
        #[arg(short, long)]
        name: Option<String>,

        /// Skip the SVG preview
        #[arg(long)]
        no_svg: bool,
    },
    /// Print the reference recipe as JSON
    Recipe,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli.command) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Build {
            recipe,
            out_dir,
            name,
            no_svg,
        } => {
            let recipe = match recipe {
                Some(path) => Recipe::load(&path)?,
                None => Recipe::default(),
            };
            let stem = name.unwrap_or_else(|| recipe.library_name.clone());
            build(&recipe, &out_dir, &stem, !no_svg)
        }
        Commands::Recipe => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", Recipe::default().to_json()?)?;
            Ok(())
        }
    }
}

fn build(recipe: &Recipe, out_dir: &Path, stem: &str, svg: bool) -> Result<(), Box<dyn Error>> {
    info!("assembling '{}'", recipe.library_name);
    let library = assemble(recipe)?;

    fs::create_dir_all(out_dir)?;

    let gds_path = out_dir.join(format!("{stem}.gds"));
    write_atomically(&gds_path, |file| {
        GdsWriter::with_settings(file, recipe.gds).write(&library)?;
        Ok(())
    })?;
    info!("wrote {}", gds_path.display());

    if svg {
        let svg_path = out_dir.join(format!("{stem}.svg"));
        write_atomically(&svg_path, |file| {
            write_svg(&library, &recipe.top_cell, &recipe.svg, file)?;
            Ok(())
        })?;
        info!("wrote {}", svg_path.display());
    }
    Ok(())
}

/// Write through a temporary file next to `path` and move it into place
/// only once `write` succeeds.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<(), Box<dyn Error>>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.persist(path)?;
    Ok(())
}
