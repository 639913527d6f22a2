//! slimtrace CLI - render the demo scene and inspect the renderer's caches.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use slimtrace::RenderMode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod demo;

#[derive(Parser)]
#[command(name = "slimtrace")]
#[command(author, version, about = "Real-time primitive ray tracer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the demo scene to a PNG
    Render {
        /// Output image
        #[arg(short, long, default_value = "slimtrace.png")]
        output: PathBuf,

        /// Render settings (TOML)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Shading mode: beauty, depth, normals or uvs
        #[arg(short, long)]
        mode: Option<RenderMode>,

        /// Execution backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,

        /// Image width
        #[arg(long)]
        width: Option<u16>,

        /// Image height
        #[arg(long)]
        height: Option<u16>,

        /// Turn the camera by this many degrees about the vertical axis
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        yaw: f32,

        /// Change the focal length by this amount
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        zoom: f32,

        /// Draw the BVH wireframe
        #[arg(long)]
        show_bvh: bool,

        /// Outline screen-space bounds
        #[arg(long)]
        show_ssb: bool,
    },

    /// Show scene statistics, masks and BVH shape for the demo scene
    Info {
        /// Viewport width used for the screen-space bounds
        #[arg(long, default_value = "640")]
        width: u16,

        /// Viewport height used for the screen-space bounds
        #[arg(long, default_value = "360")]
        height: u16,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum BackendArg {
    /// Host threads
    Cpu,
    /// wgpu compute kernel
    Gpu,
}

impl From<BackendArg> for slimtrace::Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cpu => Self::Cpu,
            BackendArg::Gpu => Self::Gpu,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(!cli.no_color)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Render {
            output,
            settings,
            mode,
            backend,
            width,
            height,
            yaw,
            zoom,
            show_bvh,
            show_ssb,
        } => {
            let options = commands::render::RenderOptions {
                output,
                settings,
                mode,
                backend: backend.map(Into::into),
                width,
                height,
                yaw,
                zoom,
                show_bvh,
                show_ssb,
            };
            commands::render::run(&options)?;
        }
        Commands::Info {
            width,
            height,
            json,
        } => {
            commands::info::run(width, height, json)?;
        }
    }

    Ok(())
}
