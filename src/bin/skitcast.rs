use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "skitcast", version)]
struct Cli {
    /// Input skit script.
    script: PathBuf,

    /// Override the script's declared output path.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Sprite and font root (default: the script's directory).
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Caption font file (overrides discovery).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Crossfade window between adjacent distinct sprite segments, in seconds.
    #[arg(long, default_value_t = 0.0)]
    crossfade: f64,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Render chunk size in frames.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Reuse identical consecutive frames (parallel mode only).
    #[arg(long, default_value_t = false)]
    static_frame_elision: bool,

    /// Print the compiled render plan as JSON and exit without rendering.
    #[arg(long, default_value_t = false)]
    dump_plan: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("read script '{}'", cli.script.display()))?;
    let engine = skitcast::EspeakSynthesizer::default();
    let plan = skitcast::compile_script(&source, &engine)?;

    if cli.dump_plan {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let assets_dir = cli.assets_dir.clone().unwrap_or_else(|| {
        cli.script
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .to_path_buf()
    });
    let mut assets = skitcast::AssetStore::open(assets_dir, cli.font.as_deref())?;
    assets.preload_for_plan(&plan)?;

    let opts = skitcast::RenderOpts {
        compose: skitcast::ComposeOptions {
            crossfade_secs: cli.crossfade,
        },
        threading: skitcast::RenderThreading {
            parallel: cli.parallel,
            chunk_size: cli.chunk_size,
            threads: cli.threads,
            static_frame_elision: cli.static_frame_elision,
        },
    };
    let out = cli.out.clone().unwrap_or_else(|| plan.output.clone());
    let stats = skitcast::render_plan_to_mp4(&plan, &assets, &out, &opts)?;

    if stats.frames_elided > 0 {
        eprintln!(
            "wrote {} ({} frames, {} elided)",
            out.display(),
            stats.frames_total,
            stats.frames_elided
        );
    } else {
        eprintln!("wrote {} ({} frames)", out.display(), stats.frames_total);
    }
    Ok(())
}
