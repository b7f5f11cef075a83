//! glengine CLI - deferred renderer viewer and headless tools.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use glengine::pipeline::environment::{CubemapFaces, Environment, ProceduralSky};
use glengine::pipeline::kernel::{sample_rng, OcclusionSampleKernel};
use glengine::pipeline::reference::{ReferenceCamera, ReferenceRenderer, ReferenceScene};
use glengine::pipeline::PipelineConfig;

#[derive(Parser, Debug)]
#[clap(name = "glengine", author, version, about, long_about = None)]
struct Cli {
    /// More log output (repeatable)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive viewer (default).
    View {
        #[clap(flatten)]
        scene: SceneArgs,
    },
    /// Render one frame on the CPU and write it as PNG.
    Reference {
        #[clap(flatten)]
        scene: SceneArgs,

        #[clap(short, long, default_value = "frame.png")]
        out: PathBuf,

        #[clap(long, default_value_t = 640)]
        width: usize,

        #[clap(long, default_value_t = 360)]
        height: usize,
    },
    /// Print an SSAO sample kernel as JSON.
    Kernel {
        #[clap(short, long, default_value_t = 64)]
        size: usize,

        #[clap(long)]
        seed: Option<u64>,
    },
    /// Print the effective pipeline configuration as JSON.
    Config {
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}

/// Options shared by everything that renders a frame.
#[derive(Args, Debug, Default, Clone)]
struct SceneArgs {
    /// JSON pipeline configuration; missing keys keep their defaults
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Seed for the SSAO kernel and noise tile
    #[clap(long)]
    seed: Option<u64>,

    /// Directory with right/left/top/bottom/back/front face images
    #[clap(long)]
    cubemap: Option<PathBuf>,

    /// Debug view: 1 composite, 2 position, 3 normal, 4 occlusion, 5 albedo
    #[clap(long)]
    view: Option<u32>,
}

impl SceneArgs {
    /// Defaults, then the config file, then flags.
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(view) = self.view {
            if !config.set_debug_view_index(view) {
                anyhow::bail!("debug view {view} is not in 1..=5");
            }
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbose as i8 - cli.quiet as i8;
    let _log_guard = glengine::logging::init(verbosity);

    match cli.command.unwrap_or(Commands::View { scene: SceneArgs::default() }) {
        Commands::View { scene } => cmd_view(&scene),
        Commands::Reference { scene, out, width, height } => cmd_reference(&scene, &out, width, height),
        Commands::Kernel { size, seed } => cmd_kernel(size, seed),
        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

#[cfg(feature = "viewer")]
fn cmd_view(scene: &SceneArgs) -> Result<()> {
    let config = scene.pipeline_config()?;
    glengine::viewer::run(glengine::viewer::ViewerOptions {
        config,
        cubemap: scene.cubemap.clone(),
    })
}

#[cfg(not(feature = "viewer"))]
fn cmd_view(_scene: &SceneArgs) -> Result<()> {
    anyhow::bail!("built without the `viewer` feature; use `glengine reference` instead")
}

fn cmd_reference(scene: &SceneArgs, out: &Path, width: usize, height: usize) -> Result<()> {
    let config = scene.pipeline_config()?;
    let environment: Box<dyn Environment> = match &scene.cubemap {
        Some(dir) => Box::new(
            CubemapFaces::load(dir).with_context(|| format!("failed to load cubemap from {}", dir.display()))?,
        ),
        None => Box::new(ProceduralSky::default()),
    };

    let mut renderer = ReferenceRenderer::new(config.seed)?;
    let camera = ReferenceCamera::look_at(
        glam::Vec3::new(0.0, 1.6, 4.0),
        glam::Vec3::new(0.0, 0.4, 0.0),
        glam::Vec3::Y,
        45.0,
        width as f32 / height.max(1) as f32,
    );
    let frame = renderer.render(&config, &ReferenceScene::default(), &camera, environment.as_ref(), width, height)?;
    frame.save_png(out).with_context(|| format!("failed to write {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn cmd_kernel(size: usize, seed: Option<u64>) -> Result<()> {
    let kernel = OcclusionSampleKernel::generate(size, &mut sample_rng(seed))?;
    println!("{}", serde_json::to_string_pretty(&kernel)?);
    Ok(())
}

fn cmd_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    println!("{}", config.to_json_string()?);
    Ok(())
}
