use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use rymlinks::{cli, config, error, set_verbose, types::LinkMode};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Print diagnostic output
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in to Spotify (needed for track links)
    Login,

    /// Remove all stored Spotify tokens
    Logout,

    /// Show app token and login status
    Status,

    /// Print Spotify links for a chart page
    Links(LinksOptions),

    /// List the albums found on a chart page
    Albums(PageOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct PageOptions {
    /// Chart URL or path to a saved chart page
    source: String,

    /// Chart URL of a saved page, used to detect the chart type
    #[clap(long)]
    page_url: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct LinksOptions {
    #[clap(flatten)]
    page: PageOptions,

    /// Which links to produce; song charts always yield song links
    #[clap(long, value_enum, default_value_t = LinkMode::Album)]
    mode: LinkMode,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    set_verbose(cli.verbose || config::debug_enabled());

    match cli.command {
        Command::Login => cli::login().await,
        Command::Logout => cli::logout().await,
        Command::Status => cli::status().await,
        Command::Links(opt) => cli::links(opt.page.source, opt.page.page_url, opt.mode).await,
        Command::Albums(opt) => cli::albums(opt.source, opt.page_url).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
