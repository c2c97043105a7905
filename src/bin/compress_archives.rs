use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use pdfzip_core::{
    init_logging, BatchObserver, BatchOrchestrator, CancellationToken, DomainError, InputItem,
    ItemStatus, OutputItem, ProcessorConfig, QualitySetting,
};

struct Args {
    quality: Option<QualitySetting>,
    out_dir: PathBuf,
    skip_compression: bool,
    files: Vec<PathBuf>,
}

/// Prints batch events to the terminal
struct ConsoleObserver;

impl BatchObserver for ConsoleObserver {
    fn on_progress(&self, fraction: f64) {
        println!("⏳ {:>5.1}%", fraction * 100.0);
    }

    fn on_error(&self, error: &DomainError, item: &InputItem) {
        eprintln!("❌ {}: {}", item.name, error);
    }

    fn on_complete(&self, items: &[OutputItem]) {
        println!("✅ Batch finished, {} item(s)", items.len());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            print_usage();
            std::process::exit(2);
        }
    };

    let mut config = ProcessorConfig::from_env()?;
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    config.skip_compression |= args.skip_compression;

    let mut items = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let item = match InputItem::from_path(path).await {
            Ok(item) => item,
            Err(e) => {
                eprintln!("⚠️  {}: {}", path.display(), e);
                InputItem::for_path(path)
            }
        };
        items.push(item);
    }

    tokio::fs::create_dir_all(&args.out_dir).await?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 Cancellation requested, finishing the current document...");
            signal_token.cancel();
        }
    });

    let mut orchestrator = BatchOrchestrator::new(config);
    let config = orchestrator.config();

    println!("📦 Archive Compression");
    println!("======================");
    println!("Quality: {}", config.quality);
    println!("Engine:  {}", config.ghostscript_path.as_deref().unwrap_or("gs"));
    println!("Limit:   {} bytes in, {} bytes expanded", config.max_input_bytes, config.max_extracted_bytes);
    if config.skip_compression {
        println!("Mode:    validation only");
    }
    println!("Output:  {}", args.out_dir.display());

    let result = orchestrator.run(&items, &ConsoleObserver, &token).await;

    for item in &result.items {
        if item.status != ItemStatus::Compressed {
            continue;
        }
        let target = args.out_dir.join(&item.name);
        tokio::fs::write(&target, item.read_bytes().await?.as_slice()).await?;
        println!("💾 {}", target.display());
    }

    println!("{}", serde_json::to_string_pretty(&result.reports())?);

    if result.cancelled {
        std::process::exit(130);
    }
    Ok(())
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args {
        quality: None,
        out_dir: PathBuf::from("."),
        skip_compression: false,
        files: Vec::new(),
    };

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-q" | "--quality" => {
                let value = raw.next().ok_or("--quality needs a value")?;
                let quality = QualitySetting::from_str(&value).map_err(|e| e.to_string())?;
                args.quality = Some(quality);
            }
            "-o" | "--out" => {
                let value = raw.next().ok_or("--out needs a directory")?;
                args.out_dir = PathBuf::from(value);
            }
            "--skip-compression" => args.skip_compression = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {}", flag)),
            _ => args.files.push(PathBuf::from(&arg)),
        }
    }

    if args.files.is_empty() {
        return Err("No input files given".to_string());
    }
    Ok(args)
}

fn print_usage() {
    eprintln!("Usage: compress_archives [--quality screen|ebook|printer|prepress|none] [--out DIR] [--skip-compression] FILE...");
}
