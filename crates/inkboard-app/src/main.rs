//! Main application entry point.

use clap::{CommandFactory, Parser, Subcommand};
use inkboard_app::{Runner, Script, ScriptError, ShortcutRegistry, default_output_path, load_config, write_frame};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkboard", version, about = "Replay recorded whiteboard sessions")]
struct Cli {
    /// Print the keyboard shortcuts and exit.
    #[arg(long)]
    shortcuts: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a session script and export the committed frame as a PNG.
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Session script (JSON).
    script: PathBuf,

    /// Output PNG path. Defaults to `whiteboard-<unix millis>.png`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Session configuration (JSON). Overrides the script's own config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in logical pixels.
    #[arg(long)]
    width: Option<f64>,

    /// Viewport height in logical pixels.
    #[arg(long)]
    height: Option<f64>,

    /// Device pixel ratio.
    #[arg(long)]
    dpr: Option<f64>,

    /// Print the final session status as JSON.
    #[arg(long, default_value_t = false)]
    status: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.shortcuts {
        ShortcutRegistry::print_all();
        return;
    }

    let result = match cli.cmd {
        Some(Command::Replay(args)) => cmd_replay(args),
        None => {
            let _ = Cli::command().print_help();
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_replay(args: ReplayArgs) -> Result<(), ScriptError> {
    let script = Script::from_path(&args.script)?;
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => script.config.clone().unwrap_or_default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(dpr) = args.dpr {
        config.device_pixel_ratio = dpr;
    }

    log::info!("Replaying {} step(s) from {}", script.steps.len(), args.script.display());
    let runner = Runner::replay(&script, config)?;

    match runner.session().export_raster() {
        Some(frame) => {
            let out = args.out.unwrap_or_else(default_output_path);
            write_frame(&out, &frame)?;
            eprintln!("wrote {}", out.display());
        }
        None => log::warn!("Nothing was committed; no image written"),
    }

    if args.status {
        let report = serde_json::json!({
            "summary": runner.summary(),
            "session": runner.session().status(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
