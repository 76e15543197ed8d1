//! `sketchroom` command-line entry point.
//!
//! Replays a gesture script through a drawing surface, then writes the PNG
//! (`render`) or saves it through the persistence API (`post`).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sketchroom_app::{AppConfig, DrawingSurface, GestureScript, HttpGateway, SaveError, ScriptError};
use sketchroom_core::presence::NativeWebSocket;
use sketchroom_core::{
    AuthorIdentity, MemoryGateway, PersistenceGateway, PresenceChannel, PresenceState, Viewport,
};
use sketchroom_render::ExportError;

/// How long to wait for the room join before drawing anyway.
const JOIN_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no author; pass --user or set \"author\" in the script")]
    MissingAuthor,
}

#[derive(Parser, Debug)]
#[command(name = "sketchroom", about = "Replay drawing gestures, export and save artwork")]
struct Cli {
    /// Presence relay WebSocket URL
    #[arg(long, global = true, env = "SKETCHROOM_PRESENCE_URL")]
    presence: Option<String>,

    /// Room to join while drawing (requires --presence)
    #[arg(long, global = true)]
    room: Option<String>,

    /// Local user id (identity provider subject)
    #[arg(long, global = true, env = "SKETCHROOM_USER")]
    user: Option<String>,

    /// Device scale factor; overrides the script and config viewport
    #[arg(long, global = true)]
    scale_factor: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the drawing as PNG
    Render(RenderArgs),
    /// Save the drawing through the persistence API
    Post(PostArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    script: PathBuf,

    #[arg(long, required_unless_present = "data_url")]
    out: Option<PathBuf>,

    /// Print the image as a data URL
    #[arg(long, default_value_t = false)]
    data_url: bool,
}

#[derive(Args, Debug)]
struct PostArgs {
    #[arg(long)]
    script: PathBuf,

    #[arg(long, env = "SKETCHROOM_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig {
        presence_url: cli.presence.clone(),
        ..AppConfig::default()
    };

    match &cli.command {
        Command::Render(args) => run_render(&cli, &config, args).await,
        Command::Post(args) => run_post(&cli, &config, args).await,
    }
}

async fn run_render(cli: &Cli, config: &AppConfig, args: &RenderArgs) -> Result<(), CliError> {
    let script = GestureScript::load(&args.script)?;
    let mut surface = mount_surface(cli, config, &script, MemoryGateway::new()).await;

    let image = surface.export()?;
    surface.unmount();

    if let Some(out) = &args.out {
        std::fs::write(out, &image.png).map_err(|source| CliError::Write {
            path: out.clone(),
            source,
        })?;
        eprintln!("wrote {}x{} PNG to {}", image.width, image.height, out.display());
    }
    if args.data_url {
        println!("{}", image.to_data_url());
    }
    Ok(())
}

async fn run_post(cli: &Cli, config: &AppConfig, args: &PostArgs) -> Result<(), CliError> {
    let script = GestureScript::load(&args.script)?;
    let author = match (&cli.user, &script.author) {
        (Some(user), _) => AuthorIdentity::new(user.clone()),
        (None, Some(author)) => author.clone(),
        (None, None) => return Err(CliError::MissingAuthor),
    };

    let gateway = HttpGateway::new(&args.base_url);
    let mut surface = mount_surface(cli, config, &script, gateway).await;

    let result = surface.save(&author).await;
    surface.unmount();
    result?;

    println!("saved artwork for {}", author.sub);
    Ok(())
}

/// Mount a surface (joining the room when asked), then replay the script.
async fn mount_surface<G: PersistenceGateway>(
    cli: &Cli,
    config: &AppConfig,
    script: &GestureScript,
    gateway: G,
) -> DrawingSurface<G> {
    let mut surface = DrawingSurface::new(config, gateway);

    match (&config.presence_url, &cli.room) {
        (Some(url), Some(room)) => {
            let channel = PresenceChannel::new(NativeWebSocket::new(), url.clone(), room.clone(), cli.user.clone());
            surface = surface.with_presence(channel);
        }
        (None, Some(room)) => log::warn!("--room {} ignored without --presence", room),
        _ => {}
    }

    surface.mount(resolve_viewport(cli.scale_factor, script, config));
    if surface.presence().is_some() {
        wait_for_join(&mut surface).await;
    }

    script.apply(surface.session_mut());

    for event in surface.poll_presence() {
        log::info!("presence: {:?}", event);
    }
    surface
}

/// Script viewport over config viewport, with `--scale-factor` winning only
/// when it was given.
fn resolve_viewport(scale_factor: Option<f64>, script: &GestureScript, config: &AppConfig) -> Viewport {
    let viewport = script.viewport.unwrap_or(config.viewport);
    match scale_factor {
        Some(scale_factor) => Viewport {
            scale_factor,
            ..viewport
        },
        None => viewport,
    }
}

async fn wait_for_join<G: PersistenceGateway>(surface: &mut DrawingSurface<G>) {
    let deadline = tokio::time::Instant::now() + JOIN_WAIT;
    while tokio::time::Instant::now() < deadline {
        for event in surface.poll_presence() {
            log::info!("presence: {:?}", event);
        }
        match surface.presence_state() {
            PresenceState::Joined { room_id } => {
                log::info!("joined room {}", room_id);
                return;
            }
            PresenceState::Disconnected => return,
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    log::warn!("room join not confirmed; drawing offline");
}
