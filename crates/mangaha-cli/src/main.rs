#[macro_use]
extern crate log;

mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mangaha::infrastructure::{config::Config, logging};

#[derive(Parser)]
#[clap(version, about = "Scrape and download manga from the command line")]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
    #[clap(subcommand)]
    subcmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search titles
    Search {
        term: String,
        /// Store every result in the database
        #[clap(long)]
        save: bool,
        /// With --save, also download every chapter of every result
        #[clap(long, requires = "save")]
        chapters: bool,
    },
    /// Store a manga and its chapter list
    Manga { url: String },
    /// List the pages of a chapter, or build its pdf
    Chapter {
        url: String,
        #[clap(long)]
        pdf: Option<PathBuf>,
    },
    /// List every series link of the site
    Series {
        /// Number of listing pages to walk, all of them by default
        #[clap(long)]
        pages: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    logging::init();

    let opts: Opts = Opts::parse();
    let config = Config::open(opts.config)?;

    match opts.subcmd {
        Command::Search {
            term,
            save,
            chapters,
        } => run::search(&config, &term, save, chapters).await?,
        Command::Manga { url } => run::manga(&config, &url).await?,
        Command::Chapter { url, pdf } => run::chapter(&config, &url, pdf).await?,
        Command::Series { pages } => run::series(&config, pages).await?,
    }

    Ok(())
}
