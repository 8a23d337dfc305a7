use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use osr_bridge::{BridgeConfig, ByteOrderChoice, PixelLayout, SoftwareRenderer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "osr-bridge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted browser session headless and write the last presented frame as PNG.
    Run(RunArgs),
    /// Print the channel masks used for a pixel layout.
    Masks(MasksArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Bridge config JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override the configured byte order.
    #[arg(long, value_enum)]
    byte_order: Option<OrderArg>,
}

#[derive(Parser, Debug)]
struct MasksArgs {
    /// Layout tag: RGB, RGBX or RGBA.
    #[arg(long)]
    layout: String,

    #[arg(long, value_enum, default_value_t = OrderArg::Native)]
    byte_order: OrderArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrderArg {
    Native,
    Little,
    Big,
}

impl From<OrderArg> for ByteOrderChoice {
    fn from(v: OrderArg) -> Self {
        match v {
            OrderArg::Native => Self::Native,
            OrderArg::Little => Self::Little,
            OrderArg::Big => Self::Big,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Masks(args) => cmd_masks(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(p) => BridgeConfig::from_json_path(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(BridgeConfig::default()),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = read_config(args.config.as_deref())?;
    if let Some(order) = args.byte_order {
        config.byte_order = order.into();
    }

    let session = osr_bridge::script::Session::from_json_path(&args.script)
        .with_context(|| format!("load script '{}'", args.script.display()))?;
    let (mut engine, mut events) = session.into_parts();
    let mut renderer = SoftwareRenderer::new(config.width, config.height);

    let outcome = osr_bridge::launch(&config, &mut engine, &mut renderer, &mut events)?;
    eprintln!(
        "{}: stopped after {} iterations ({:?}): {} installed, {} dropped, {} events forwarded",
        config.title,
        outcome.stats.iterations,
        outcome.reason,
        outcome.stats.frames_installed,
        outcome.stats.frames_dropped,
        outcome.stats.events_forwarded,
    );

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    renderer
        .framebuffer()
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());

    outcome.into_result()?;
    Ok(())
}

fn cmd_masks(args: MasksArgs) -> anyhow::Result<()> {
    let layout: PixelLayout = args.layout.parse()?;
    let order = ByteOrderChoice::from(args.byte_order).resolve();
    let m = osr_bridge::mask_table(order, layout)?;
    println!("layout:     {}", layout.mode());
    println!("byte order: {order:?}");
    println!("rmask:      0x{:08X}", m.r);
    println!("gmask:      0x{:08X}", m.g);
    println!("bmask:      0x{:08X}", m.b);
    println!("amask:      0x{:08X}", m.a);
    Ok(())
}
