use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use cardexport::rendering::layout::{layout_card, CardContent, CardTheme, Logo, CARD_SIZE};
use cardexport::{
    print_dimensions, CardElement, CardExporter, DirectorySink, ExporterConfig, ImageOrigin,
    PreviewFormat,
};

#[derive(Parser)]
#[command(name = "cardexport", version, about = "Export business cards as PNG or PDF")]
struct Cli {
    /// Exporter configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct CardArgs {
    /// Card description (JSON with `content`, `theme`, optional `logo`)
    #[arg(long)]
    card: PathBuf,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Export as PNG
    Png {
        #[command(flatten)]
        card: CardArgs,
        #[arg(long, default_value = "business-card.png")]
        name: String,
        /// Skip the tiered chain and use the minimal capture only
        #[arg(long)]
        fallback: bool,
    },
    /// Export as a 3.5in x 2in PDF
    Pdf {
        #[command(flatten)]
        card: CardArgs,
        #[arg(long, default_value = "business-card.pdf")]
        name: String,
    },
    /// Export PNG and PDF
    All {
        #[command(flatten)]
        card: CardArgs,
        #[arg(long, default_value = "business-card")]
        base: String,
    },
    /// Print a data URL preview
    Preview {
        #[command(flatten)]
        card: CardArgs,
        #[arg(long, value_enum, default_value_t = PreviewKind::Png)]
        format: PreviewKind,
        #[arg(long, default_value_t = 0.8)]
        quality: f32,
    },
    /// Print card dimensions in common print units
    Dimensions,
    /// Check that capture works on this machine
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreviewKind {
    Png,
    Jpeg,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
enum LogoOrigin {
    SameOrigin,
    Cors,
    CrossOrigin,
}

#[derive(Deserialize)]
struct CardFile {
    #[serde(default)]
    content: CardContent,
    #[serde(default)]
    theme: CardTheme,
    logo: Option<PathBuf>,
    logo_origin: Option<LogoOrigin>,
    width: Option<u32>,
    height: Option<u32>,
}

fn load_card(path: &Path) -> anyhow::Result<CardElement> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read card file {}", path.display()))?;
    let file: CardFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse card file {}", path.display()))?;

    let logo = match &file.logo {
        Some(logo_path) => {
            // Relative logo paths resolve against the card file
            let resolved = path.parent().unwrap_or(Path::new(".")).join(logo_path);
            let pixels = image::open(&resolved)
                .with_context(|| format!("failed to load logo {}", resolved.display()))?
                .to_rgba8();
            let origin = match file.logo_origin {
                None | Some(LogoOrigin::SameOrigin) => ImageOrigin::SameOrigin,
                Some(LogoOrigin::Cors) => ImageOrigin::CorsEnabled,
                Some(LogoOrigin::CrossOrigin) => ImageOrigin::CrossOrigin,
            };
            Some(Logo {
                pixels: Arc::new(pixels),
                origin,
            })
        }
        None => None,
    };

    let size = cardexport::Size {
        width: file.width.unwrap_or(CARD_SIZE.width),
        height: file.height.unwrap_or(CARD_SIZE.height),
    };
    let commands = layout_card(&file.content, &file.theme, logo.as_ref(), size);
    Ok(CardElement::new(size.width, size.height).with_display_list(commands))
}

fn exporter(config: &Option<PathBuf>, out: &Path) -> anyhow::Result<CardExporter> {
    let cfg = match config {
        Some(p) => ExporterConfig::from_file(p)?,
        None => ExporterConfig::default(),
    };
    Ok(CardExporter::new(cfg, Arc::new(DirectorySink::new(out)))?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Png {
            card,
            name,
            fallback,
        } => {
            let element = load_card(&card.card)?;
            let ex = exporter(&cli.config, &card.out)?;
            let result = if fallback {
                ex.export_fallback(&element, &name).await?
            } else {
                ex.export_png(&element, &name).await?
            };
            print_json(&result)?;
        }
        Command::Pdf { card, name } => {
            let element = load_card(&card.card)?;
            let ex = exporter(&cli.config, &card.out)?;
            let result = ex.export_pdf(&element, &name).await?;
            print_json(&result)?;
        }
        Command::All { card, base } => {
            let element = load_card(&card.card)?;
            let ex = exporter(&cli.config, &card.out)?;
            let report = ex.export_multiple_formats(&element, &base).await;
            print_json(&report)?;
            if !report.png.success || !report.pdf.success {
                bail!("one or more formats failed to export");
            }
        }
        Command::Preview {
            card,
            format,
            quality,
        } => {
            let element = load_card(&card.card)?;
            let ex = exporter(&cli.config, &card.out)?;
            let format = match format {
                PreviewKind::Png => PreviewFormat::Png,
                PreviewKind::Jpeg => PreviewFormat::Jpeg,
            };
            println!("{}", ex.preview(&element, format, quality).await?);
        }
        Command::Dimensions => print_json(&print_dimensions())?,
        Command::Check => {
            let ex = exporter(&cli.config, Path::new("."))?;
            if !ex.check_export_support().await {
                bail!("export self check failed");
            }
            println!("export self check passed");
        }
    }

    Ok(())
}
