use std::env;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use pagehub::{
    generation::HttpContentGenerator,
    storage::{Config, Store, config::LoggingConfig},
};

mod cli;
use cli::{Command, USAGE, parse_args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = match parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load_or_create().context("failed to load configuration")?;
    setup_logging(&config.logging);

    let output = run(command, &config).await?;
    println!("{}", output);
    Ok(())
}

async fn run(command: Command, config: &Config) -> anyhow::Result<String> {
    match command {
        Command::Caption(prompt) => {
            let generator = HttpContentGenerator::new(&config.generation);
            return cli::caption(&generator, &prompt).await;
        }
        Command::Image(prompt) => {
            let generator = HttpContentGenerator::new(&config.generation);
            return cli::image(&generator, &prompt).await;
        }
        _ => {}
    }

    let store = Arc::new(
        Store::open(&config.storage.database_path).with_context(|| {
            format!("failed to open {}", config.storage.database_path.display())
        })?,
    );

    match command {
        Command::Calendar(args) => {
            let options = config.grid_options()?;
            let today = Utc::now().with_timezone(&options.utc_offset()).date_naive();
            cli::calendar_json(&args, &store, &options, config.default_view()?, today)
        }
        Command::Authorize {
            user,
            workspace,
            permission,
        } => {
            let authorizer = cli::authorizer_for(store);
            Ok(cli::authorize(&authorizer, user, workspace, &permission).await)
        }
        Command::AddUser {
            email,
            name,
            super_admin,
        } => {
            let profile = store.create_user_profile(&email, name.as_deref(), super_admin)?;
            Ok(profile.id.to_string())
        }
        Command::SetSuperAdmin { user, enabled } => {
            store.set_super_admin(user, enabled)?;
            Ok(format!("super-admin {}", if enabled { "on" } else { "off" }))
        }
        Command::AddWorkspace { name, owner } => {
            let workspace = store.create_workspace(&name, owner)?;
            Ok(workspace.id.to_string())
        }
        Command::ListMembers(workspace) => {
            Ok(serde_json::to_string_pretty(&store.workspace_members(workspace)?)?)
        }
        Command::InviteMember {
            workspace,
            email,
            role,
        } => {
            let membership = store.invite_member(workspace, &email, role)?;
            Ok(serde_json::to_string_pretty(&membership)?)
        }
        Command::AddPost(post) => cli::add_post(&store, post),
        Command::Caption(_) | Command::Image(_) | Command::Help => Ok(USAGE.to_string()),
    }
}

fn setup_logging(logging: &LoggingConfig) {
    std::fs::create_dir_all(&logging.directory).ok();

    let file_appender = tracing_appender::rolling::daily(&logging.directory, "pagehub.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("PAGEHUB_LOG")
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("pagehub started");
}
