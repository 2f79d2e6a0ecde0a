use chrono::{DateTime, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use inkwell::build::{build_site, BuildOptions};
use inkwell::config::Config;
use inkwell::index::PostIndex;
use inkwell::route::{ssg_routes, Route, RouteTable};
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn app() -> App<'static, 'static> {
    App::new("inkwell")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("Increases logging verbosity (-v, -vv, -vvv)"),
        )
        .arg(
            Arg::with_name("root")
                .long("root")
                .takes_value(true)
                .value_name("DIR")
                .global(true)
                .help("Directory to search upward from for site.config.json"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Writes posts-meta.json, sitemap, robots.txt and feeds into the output directory")
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("Output directory (default: <root>/dist)"),
                )
                .arg(
                    Arg::with_name("deny-collisions")
                        .long("deny-collisions")
                        .help("Fails the build when two posts share a slug"),
                )
                .arg(
                    Arg::with_name("now")
                        .long("now")
                        .takes_value(true)
                        .value_name("RFC3339")
                        .help("Build timestamp used for undated feed entries"),
                ),
        )
        .subcommand(SubCommand::with_name("routes").about("Prints every route to pre-render"))
        .subcommand(
            SubCommand::with_name("resolve")
                .about("Resolves a URL path against the post index")
                .arg(Arg::with_name("path").required(true).index(1)),
        )
        .subcommand(SubCommand::with_name("index").about("Prints the post index as JSON"))
}

fn main() {
    let matches = app().get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = run(&matches) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {}", err);
            source = err.source();
        }
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let root = match matches.value_of("root") {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };
    let mut config = Config::from_directory(&root)?;

    match matches.subcommand() {
        ("build", Some(sub)) => {
            if let Some(out) = sub.value_of("out") {
                config.output_directory = PathBuf::from(out);
            }
            let now = match sub.value_of("now") {
                Some(now) => DateTime::parse_from_rfc3339(now)?.with_timezone(&Utc),
                None => Utc::now(),
            };
            let report = build_site(
                &config,
                &BuildOptions {
                    deny_collisions: sub.is_present("deny-collisions"),
                    now,
                },
            )?;
            for path in &report.written {
                println!("{}", path.display());
            }
            info!(patched = report.patched.len(), "Build finished");
        }
        ("routes", Some(_)) => {
            for route in ssg_routes(&PostIndex::build(&config.posts_source_directory)?) {
                println!("{}", route);
            }
        }
        ("resolve", Some(sub)) => {
            let index = PostIndex::build(&config.posts_source_directory)?;
            let path = sub.value_of("path").unwrap_or("/");
            match RouteTable::from_index(&index).resolve(path) {
                Route::Home => println!("home"),
                Route::Article {
                    category_slug,
                    article_slug,
                } => match index.resolve_post_id_by_slug(&category_slug, &article_slug) {
                    Some(id) => println!("article {}", id),
                    None => println!("not-found"),
                },
                Route::Tags { category_slug } => println!("tags {}", category_slug),
                Route::NotFound => println!("not-found"),
            }
        }
        ("index", Some(_)) => {
            let index = PostIndex::build(&config.posts_source_directory)?;
            let stats = index.stats();
            info!(
                posts = stats.total_posts,
                categories = stats.total_categories,
                tags = stats.total_tags,
                words = stats.total_words,
                "Indexed posts"
            );
            println!("{}", index.to_json()?);
        }
        _ => {
            app().print_help()?;
            println!();
        }
    }
    Ok(())
}
