use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use folha::build::build_site;
use folha::config::Config;
use folha::content::{ContentSource, PrismicClient};
use folha::reading_time;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let matches = App::new("folha")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from a headless content API")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .value_name("DIR")
                .default_value(".")
                .help("Directory to search (along with its parents) for folha.yaml"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .value_name("DIR")
                .default_value("_output")
                .help("Directory to write the site into"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Log debug output"),
        )
        .subcommand(SubCommand::with_name("build").about("Builds the site"))
        .subcommand(
            SubCommand::with_name("reading-time")
                .about("Prints the estimated reading time of one article")
                .arg(
                    Arg::with_name("slug")
                        .required(true)
                        .index(1)
                        .help("The article's slug"),
                ),
        )
        .get_matches();

    init_tracing(matches.is_present("verbose"));

    let config = Config::from_directory(
        Path::new(matches.value_of("project").unwrap_or(".")),
        Path::new(matches.value_of("output").unwrap_or("_output")),
    )?;
    let client = PrismicClient::new(
        config.content.endpoint.clone(),
        config.content.access_token.clone(),
        config.content.timeout,
    )?;

    match matches.subcommand() {
        ("build", _) => {
            let summary = build_site(&config, &client).context("Building site")?;
            info!(
                "Built {} listing pages and {} article pages into '{}'",
                summary.listing_pages,
                summary.articles,
                config.root_output_directory.display()
            );
            Ok(())
        }
        ("reading-time", Some(args)) => print_reading_time(&config, &client, args),
        _ => Ok(()),
    }
}

fn print_reading_time(config: &Config, source: &dyn ContentSource, args: &ArgMatches) -> Result<()> {
    let slug = args.value_of("slug").unwrap_or_default();
    let article = source.get_by_uid(&config.content.document_type, slug)?;
    println!(
        "{} min ({} words)",
        reading_time::estimate(&article.content),
        reading_time::word_count(&article.content)
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(if verbose {
            tracing::Level::DEBUG.into()
        } else {
            tracing::Level::INFO.into()
        }))
        .with_writer(std::io::stderr)
        .init();
}
