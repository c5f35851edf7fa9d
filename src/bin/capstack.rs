use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "capstack", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stack the manifest's images into one PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input manifest JSON. Relative image and font paths resolve against its directory.
    #[arg(long)]
    manifest: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print the layout plan as JSON on stdout.
    #[arg(long, default_value_t = false)]
    dump_plan: bool,

    /// Caption font for both slots; overrides the manifest.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Override rayon decode threads.
    #[arg(long)]
    threads: Option<usize>,

    /// PNG compression effort in [0, 1]; overrides the manifest.
    #[arg(long)]
    quality: Option<f32>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Manifest {
    items: Vec<ManifestItem>,
    #[serde(default)]
    opts: capstack::RenderSessionOpts,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ManifestItem {
    image: String,
    #[serde(default)]
    primary: String,
    #[serde(default)]
    secondary: String,
    /// Defaults to the item's position in the list.
    #[serde(default)]
    order: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("read manifest '{}'", args.manifest.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("parse manifest '{}'", args.manifest.display()))?;
    let root = args
        .manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut opts = manifest.opts;
    if let Some(font) = args.font {
        opts.fonts = opts.fonts.with_font(font);
    }
    for slot in [&mut opts.fonts.primary_font, &mut opts.fonts.secondary_font] {
        if let Some(p) = slot.as_mut()
            && p.is_relative()
        {
            *p = root.join(&*p);
        }
    }
    if args.threads.is_some() {
        opts.threads = args.threads;
    }
    if let Some(q) = args.quality {
        opts.export.quality = q;
    }

    let items: Vec<capstack::SourceItem> = manifest
        .items
        .into_iter()
        .enumerate()
        .map(|(i, it)| {
            let order = match it.order {
                Some(o) => o,
                None => u32::try_from(i).context("too many manifest items")?,
            };
            Ok(capstack::SourceItem::new(order, it.image).with_captions(it.primary, it.secondary))
        })
        .collect::<anyhow::Result<_>>()?;

    let mut sess = capstack::RenderSession::new(capstack::FsResolver::new(root), opts)?;
    if args.dump_plan {
        let plan = sess.plan(&items)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }
    let png = sess.render_png(&items)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png.png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} ({}x{})", args.out.display(), png.width, png.height);
    Ok(())
}
