use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stereocam::capture::{Camera, CaptureObserver, CaptureSession, CaptureState};
use stereocam::config;
use stereocam::imaging::Photo;
use stereocam::record::StereogramRecord;
use stereocam::services::{RecordSettings, Services};
use stereocam::store::PhotoStore;
use stereocam::thumbnail_cache::ThumbnailCache;
use stereocam::types::ViewingMethod;
use stereocam::{Error, logging, output};

#[derive(Parser)]
#[command(name = "stereocam")]
#[command(about = "Stereogram library: import, composite, export")]
#[command(long_about = "\
Stereogram library: import, composite, export

Each stereogram is a directory under the library root holding the two
halves and a property list:

  Stereograms/
  └── 1F0C6A3E-5C1B-4A8E-9E51-0B6E3D7C1A22/
      ├── LeftPhoto.jpg
      ├── RightPhoto.jpg
      └── Properties.plist

Stereograms are addressed by their 1-based position as shown by 'list'.

Viewing methods: crosseyed, walleyed, animated-gif
(red-green and random-dot are recognised but cannot be rendered yet).

Run 'stereocam gen-config' to generate a documented stereocam.toml.")]
#[command(version)]
struct Cli {
    /// Library root directory (overrides library_root from the config)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Log level written to stderr (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every stereogram in the library
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Store two image files as a new stereogram
    Import { left: PathBuf, right: PathBuf },
    /// Store one side-by-side image, split at its midpoint
    ImportPair { image: PathBuf },
    /// Run the two-shot capture workflow, using image files as the camera
    Capture { first: PathBuf, second: PathBuf },
    /// Change how a stereogram is composited
    Mode {
        index: usize,
        method: ViewingMethod,
    },
    /// Exchange the left and right halves
    Swap { index: usize },
    /// Write the composite to a file (JPEG, or GIF for animated-gif)
    Export {
        index: usize,
        /// Output file (default: <id>.<jpg|gif> in the current directory)
        out: Option<PathBuf>,
    },
    /// Render every thumbnail as PNG into a directory
    Thumbnails { out_dir: PathBuf },
    /// Delete stereograms, in the order given, stopping at the first failure
    Delete {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Print a stock stereocam.toml with all options documented
    GenConfig,
}

/// Still image files standing in for camera hardware.
struct FileCamera;

impl Camera for FileCamera {
    fn is_available(&self) -> bool {
        true
    }
}

struct PrintObserver;

impl CaptureObserver for PrintObserver {
    fn on_progress(&mut self, photo_number: u8) {
        println!("{}", output::format_capture_progress(photo_number));
    }

    fn on_complete(&mut self, record: &StereogramRecord) {
        println!("==> Capture complete: {}", record.id());
    }

    fn on_cancelled(&mut self) {
        println!("==> Capture cancelled");
    }

    fn on_error(&mut self, error: &Error) {
        eprintln!("==> Capture failed: {}", error);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let root = cli
        .library
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.library_root));
    std::fs::create_dir_all(&root)?;
    let services = Services::local(RecordSettings::from_config(&config));
    let mut store = PhotoStore::open_with_policy(&root, services, config.open_policy)?;

    match cli.command {
        Command::List { json } => {
            if json {
                println!("{}", output::format_library_json(&store)?);
            } else {
                output::print_library(&store);
            }
        }
        Command::Import { left, right } => {
            let left = read_photo(&store, &left)?;
            let right = read_photo(&store, &right)?;
            store.create_from_images(left, right)?;
            print_last(&store);
        }
        Command::ImportPair { image } => {
            let photo = read_photo(&store, &image)?;
            store.import_side_by_side(&photo)?;
            print_last(&store);
        }
        Command::Capture { first, second } => {
            let first = read_photo(&store, &first)?;
            let second = read_photo(&store, &second)?;
            let mut observer = PrintObserver;
            let mut session = CaptureSession::new(Box::new(FileCamera), &store);
            session.start_capture(&mut observer)?;
            session.photo_captured(first, &mut observer);
            session.photo_captured(second, &mut observer);
            println!("==> Compositing");
            session.wait(&mut store, &mut observer);
            if let CaptureState::Complete(id) = session.state() {
                if let Some(index) = store.position(id) {
                    output::print_created(index, &store.records()[index]);
                }
            } else {
                return Err("capture did not complete".into());
            }
        }
        Command::Mode { index, method } => {
            let index = position(index, store.count())?;
            store.set_viewing_method(index, method)?;
            println!("{} → {}", index + 1, method);
        }
        Command::Swap { index } => {
            let index = position(index, store.count())?;
            let count = store.count();
            let record = store
                .get_mut(index)
                .ok_or(Error::NoSuchRecord { index, count })?;
            record.swap_halves()?;
            println!("Swapped halves of {}", index + 1);
        }
        Command::Export { index, out } => {
            let index = position(index, store.count())?;
            let data = store.export(index)?;
            let out = match out {
                Some(path) => path,
                None => {
                    let record = &store.records()[index];
                    PathBuf::from(format!(
                        "{}.{}",
                        record.id(),
                        record.viewing_method().file_extension()
                    ))
                }
            };
            std::fs::write(&out, &data.bytes)?;
            println!("{}", output::format_export(&data, &out));
        }
        Command::Thumbnails { out_dir } => {
            std::fs::create_dir_all(&out_dir)?;
            let mut cache = ThumbnailCache::new(config.thumbnails.capacity);
            let mut written = Vec::new();
            for (index, record) in store.iter().enumerate() {
                let thumb = cache.get_or_load(record)?;
                let file = format!("{:0>3}-{}.png", index + 1, record.id());
                thumb.pixels().save(out_dir.join(&file))?;
                written.push((index, file));
            }
            for line in output::format_thumbnails(&written, &cache.stats()) {
                println!("{}", line);
            }
        }
        Command::Delete { indices } => {
            let indices = indices
                .into_iter()
                .map(|i| position(i, store.count()))
                .collect::<Result<Vec<_>, _>>()?;
            let ids: Vec<String> = indices
                .iter()
                .filter_map(|&i| store.get(i).map(|r| r.id().to_string()))
                .collect();
            let before = store.count();
            let result = store.delete_many(&indices);
            let gone: Vec<String> = ids
                .into_iter()
                .filter(|id| !store.iter().any(|r| r.id().as_str() == id))
                .collect();
            for line in output::format_deleted(&gone) {
                println!("{}", line);
            }
            if let Err(err) = result {
                eprintln!(
                    "Stopped after {} of {} deletions",
                    before - store.count(),
                    indices.len()
                );
                return Err(err.into());
            }
        }
        // Handled before the library is opened
        Command::GenConfig => {}
    }

    Ok(())
}

/// Convert a 1-based CLI position to a store index.
fn position(index: usize, count: usize) -> Result<usize, Error> {
    index
        .checked_sub(1)
        .ok_or(Error::NoSuchRecord { index, count })
}

/// Decode an image file into a photo.
fn read_photo(store: &PhotoStore, path: &Path) -> Result<Photo, Error> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Unknown(format!("{}: {e}", path.display())),
    })?;
    let pixels = store
        .services()
        .codec
        .decode(&bytes)
        .map_err(|e| Error::InvalidFileFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Photo::new(pixels))
}

fn print_last(store: &PhotoStore) {
    if let Some(record) = store.records().last() {
        output::print_created(store.count() - 1, record);
    }
}
