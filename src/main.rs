use album_assets::{config, convert, icons, manifest, output, scan, thumbnails};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that produce thumbnails.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the thumbnail cache and re-encode every thumbnail
    #[arg(long)]
    no_cache: bool,
}

#[derive(clap::Args, Clone)]
struct ConvertArgs {
    /// Convert without asking; otherwise only the plan is printed
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args, Clone)]
struct IconsArgs {
    /// Directory that receives icon-<size>.png
    #[arg(long, default_value = ".")]
    output: PathBuf,
}

#[derive(Parser)]
#[command(name = "album-assets")]
#[command(about = "Asset pipeline for a static photo-album site")]
#[command(long_about = "\
Asset pipeline for a static photo-album site

Every subdirectory of the album root is an album; the image files in it are
its photos. Names are compared and written in Unicode NFC.

Layout:

  albums/
  ├── config.toml                  # Pipeline config (optional)
  ├── Nohn/                        # Album
  │   ├── IMG_0001.jpg
  │   ├── IMG_0002.HEIC            # → IMG_0002.webp with `convert --yes`
  │   └── .heic_archive/           # Converted originals (hidden)
  └── thumbnails/                  # Square JPEG tiles + manifest.json
  data/
  └── images.json                  # Catalog: album → files

Run 'album-assets gen-config' to generate a documented config.toml.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Album root directory
    #[arg(long, default_value = "albums", global = true)]
    albums: PathBuf,

    /// Directory for the catalog manifest
    #[arg(long, default_value = "data", global = true)]
    data: PathBuf,

    /// Thumbnail output directory [default: <albums>/thumbnails]
    #[arg(long, global = true)]
    thumbnails: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn thumbnails_dir(&self) -> PathBuf {
        self.thumbnails
            .clone()
            .unwrap_or_else(|| self.albums.join("thumbnails"))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Scan the album root and list albums without writing anything
    Check,
    /// Write the catalog manifest
    Manifest,
    /// Generate square thumbnails and their manifest
    Thumbnails(CacheArgs),
    /// Convert HEIC/HEIF photos to WebP and archive the originals
    Convert(ConvertArgs),
    /// Write the app icons
    Icons(IconsArgs),
    /// Run thumbnails, then manifest
    Build(CacheArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.albums)?;
    let catalog_path = cli.data.join(manifest::CATALOG_FILENAME);

    match &cli.command {
        Command::Check => {
            println!("==> Checking {}", cli.albums.display());
            let albums = scan::Scanner::from_config(&config.scan).scan(&cli.albums)?;
            if albums.is_empty() {
                return Err(manifest::ManifestError::NoAlbums(cli.albums.clone()).into());
            }
            output::print_check_output(&albums);
        }
        Command::Manifest => {
            let catalog = manifest::regenerate_catalog(&cli.albums, &catalog_path, &config.scan)?;
            output::print_catalog_output(&catalog, &catalog_path);
        }
        Command::Thumbnails(cache_args) => {
            run_thumbnails(&cli, &config, !cache_args.no_cache)?;
        }
        Command::Convert(args) => {
            let plan = convert::plan_conversion(&cli.albums, &config)?;
            output::print_convert_plan(&plan);
            if plan.is_empty() {
                return Ok(());
            }
            if !args.yes {
                println!("Dry run: nothing changed. Re-run with --yes to convert.");
                return Ok(());
            }

            init_thread_pool(&config.processing);
            let (tx, printer) = spawn_printer::<convert::ConvertEvent>(output::format_convert_event);
            let run = convert::convert_all(&plan, &cli.albums, &catalog_path, &config, Some(tx))?;
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_convert_summary(&run, &catalog_path);
        }
        Command::Icons(args) => {
            let written = icons::export_icons(&args.output, &config.icons.sizes)?;
            output::print_icons_output(&written);
        }
        Command::Build(cache_args) => {
            println!("==> Stage 1: Thumbnails → {}", cli.thumbnails_dir().display());
            run_thumbnails(&cli, &config, !cache_args.no_cache)?;

            println!("==> Stage 2: Catalog → {}", catalog_path.display());
            let catalog = manifest::regenerate_catalog(&cli.albums, &catalog_path, &config.scan)?;
            output::print_catalog_output(&catalog, &catalog_path);

            println!("==> Build complete");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn run_thumbnails(
    cli: &Cli,
    config: &config::PipelineConfig,
    use_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let out = cli.thumbnails_dir();
    init_thread_pool(&config.processing);
    let (tx, printer) = spawn_printer::<thumbnails::ThumbnailEvent>(output::format_thumbnail_event);
    let run = thumbnails::generate_thumbnails(
        &cli.albums,
        &out,
        config,
        use_cache,
        Some(tx),
    )?;
    printer.join().map_err(|_| "output thread panicked")?;
    output::print_thumbnail_summary(&run, &out.join(manifest::THUMBNAIL_MANIFEST_FILENAME));
    Ok(())
}

/// Print progress events on a dedicated thread until every sender is dropped.
fn spawn_printer<E: Send + 'static>(
    format: fn(&E) -> Vec<String>,
) -> (Sender<E>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<E>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in format(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::Path;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["album-assets", "check"]);
        assert_eq!(cli.albums, Path::new("albums"));
        assert_eq!(cli.data, Path::new("data"));
        assert_eq!(cli.thumbnails_dir(), Path::new("albums/thumbnails"));
    }

    #[test]
    fn thumbnails_default_follows_albums() {
        let cli = Cli::parse_from(["album-assets", "--albums", "pics", "thumbnails"]);
        assert_eq!(cli.thumbnails_dir(), Path::new("pics/thumbnails"));

        let cli = Cli::parse_from([
            "album-assets", "--albums", "pics", "--thumbnails", "out", "build",
        ]);
        assert_eq!(cli.thumbnails_dir(), Path::new("out"));
    }

    #[test]
    fn convert_is_dry_run_by_default() {
        let cli = Cli::parse_from(["album-assets", "convert"]);
        assert!(matches!(cli.command, Command::Convert(ConvertArgs { yes: false })));
        let cli = Cli::parse_from(["album-assets", "convert", "--yes"]);
        assert!(matches!(cli.command, Command::Convert(ConvertArgs { yes: true })));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["album-assets", "thumbnails", "--no-cache", "--albums", "pics"]);
        assert_eq!(cli.albums, Path::new("pics"));
        assert!(matches!(cli.command, Command::Thumbnails(CacheArgs { no_cache: true })));
    }
}
