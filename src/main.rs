use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};
use gazette::build::build_site;
use gazette::config::{Config, Overrides, RendererKind};
use std::path::PathBuf;

fn main() {
    let matches = App::new("gazette")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("message")
                .value_name("BUILD_MSG")
                .index(1)
                .conflicts_with("build-msg")
                .help("Free text shown on every page, e.g. a footer notice"),
        )
        .arg(
            Arg::with_name("build-msg")
                .long("build-msg")
                .short("m")
                .takes_value(true)
                .value_name("MSG")
                .help("Same as BUILD_MSG"),
        )
        .arg(
            Arg::with_name("project")
                .long("project")
                .short("p")
                .takes_value(true)
                .value_name("DIR")
                .help("A directory inside the project [default: .]"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .value_name("DIR")
                .help("Where to publish the site [default: <project>/.build]"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("j")
                .takes_value(true)
                .value_name("N")
                .help("The number of render workers [default: number of CPUs]"),
        )
        .arg(
            Arg::with_name("renderer")
                .long("renderer")
                .takes_value(true)
                .possible_values(&["pandoc", "native"])
                .help("The renderer backend [default: from metadata.yaml, else pandoc]"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Log skipped files and other details"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&matches) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let threads = match matches.value_of("threads") {
        Some(threads) => Some(
            threads
                .parse::<usize>()
                .with_context(|| format!("Invalid thread count `{}`", threads))?,
        ),
        None => None,
    };
    let overrides = Overrides {
        build_msg: matches
            .value_of("message")
            .or_else(|| matches.value_of("build-msg"))
            .map(str::to_owned),
        output_directory: matches.value_of_os("output").map(PathBuf::from),
        threads,
        renderer: matches
            .value_of("renderer")
            .map(str::parse::<RendererKind>)
            .transpose()?,
    };

    let project = matches
        .value_of_os("project")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::from_directory(&project, overrides)?;
    log::debug!(
        "Building {} with the {} renderer on {} threads",
        config.project_directory.display(),
        config.renderer,
        config.threads
    );

    let renderer = config.renderer()?;
    let summary = build_site(&config, &*renderer)?;
    log::info!(
        "Built {} articles, {} index pages and a feed of {} items; copied {} assets",
        summary.articles,
        summary.index_pages,
        summary.feed_items,
        summary.assets
    );
    Ok(())
}
