mod output;
mod settings;
mod transport;

use std::io;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use posts_core::{Dispatcher, Format, ListQuery, PostForm, UpdatePost};
use tracing_subscriber::EnvFilter;

use output::{Prompt, Screen};
use settings::SettingsStore;
use transport::UreqTransport;

/// Terminal client for a blog posts API
#[derive(Parser)]
#[command(name = "posts", version)]
struct Args {
    /// API base URL, e.g. http://localhost:5002/api [default: the last one used]
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Print the HTML fragment instead of plain text
    #[arg(long, global = true)]
    html: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List posts, optionally sorted or filtered by a search term
    List {
        /// Match against title and content; sort options are ignored
        #[arg(short, long)]
        search: Option<String>,
        /// Sort field: id, title or content
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc
        #[arg(long)]
        direction: Option<String>,
    },
    /// Create a post
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
    },
    /// Delete a post by id
    Delete {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Change a post's title and/or content
    Update {
        id: u64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Inspect or change saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Save the API base URL
    SetUrl { url: String },
    /// List posts on start when no command is given
    AutoLoad {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Print the settings file location and contents
    Show,
}

/// What a post command asks the dispatcher to do.
enum Action {
    List(ListQuery),
    Add(PostForm),
    Delete { id: u64, yes: bool },
    Update(u64, UpdatePost),
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let store = SettingsStore::load(SettingsStore::default_path()?)?;

    let action = match args.command {
        Some(Command::Config { command }) => return run_config(store, command),
        Some(Command::List {
            search,
            sort,
            direction,
        }) => Action::List(ListQuery {
            search,
            sort,
            direction,
        }),
        Some(Command::Add { title, content }) => Action::Add(PostForm::new(title, content)),
        Some(Command::Delete { id, yes }) => Action::Delete { id, yes },
        Some(Command::Update { id, title, content }) => {
            Action::Update(id, UpdatePost { title, content })
        }
        None if store.settings().auto_load && store.settings().api_base_url.is_some() => {
            Action::List(ListQuery::default())
        }
        None => {
            Args::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let format = if args.html { Format::Html } else { Format::Text };
    let transport = UreqTransport::new(store.settings().timeout());
    let mut dispatcher = Dispatcher::new(transport, Screen::default(), store).with_format(format);
    let base_url = args
        .api_url
        .or_else(|| dispatcher.saved_base_url())
        .unwrap_or_default();
    let all = ListQuery::default();

    let ok = match action {
        Action::List(query) => dispatcher.load_posts(&base_url, &query).is_ok(),
        Action::Add(mut form) => dispatcher.add_post(&base_url, &mut form, &all).is_ok(),
        Action::Delete { id, yes: true } => dispatcher
            .delete_post(&base_url, id, &all, &mut |_: &str| true)
            .is_ok(),
        Action::Delete { id, yes: false } => {
            let mut prompt = Prompt::new(io::stdin().lock());
            dispatcher
                .delete_post(&base_url, id, &all, &mut prompt)
                .is_ok()
        }
        Action::Update(id, input) => dispatcher.update_post(&base_url, id, &input, &all).is_ok(),
    };

    dispatcher.container().flush_to(io::stdout().lock())?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn run_config(mut store: SettingsStore, command: ConfigCommand) -> anyhow::Result<ExitCode> {
    match command {
        ConfigCommand::SetUrl { url } => {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                eprintln!("error: API base URL is missing.");
                return Ok(ExitCode::FAILURE);
            }
            store.settings_mut().api_base_url = Some(url.to_string());
            store.save()?;
            println!("API base URL set to {url}");
        }
        ConfigCommand::AutoLoad { enabled } => {
            store.settings_mut().auto_load = enabled;
            store.save()?;
            println!("auto_load = {enabled}");
        }
        ConfigCommand::Show => {
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(store.settings())?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
