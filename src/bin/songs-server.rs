use clap::{App, AppSettings, Arg};
use log::{error, info};
use songs::config::{Config, DuplicateCheck};
use songs::sled::SledGateway;
use songs::{Handlers, KnownIds, MemoryGateway, Result, Server, Song, SongStoreError, StoreGateway};
use std::process::exit;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args();

    if let Err(e) = run(config) {
        error!("{}", e);
        exit(1);
    }
}

fn parse_args() -> Config {
    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("store-service")
                .long("store-service")
                .takes_value(true)
                .env("SONGS_STORE_SERVICE")
                .help("store host, for sled the database directory"),
        )
        .arg(
            Arg::with_name("store-username")
                .long("store-username")
                .takes_value(true)
                .env("SONGS_STORE_USERNAME")
                .help("store username"),
        )
        .arg(
            Arg::with_name("store-password")
                .long("store-password")
                .takes_value(true)
                .env("SONGS_STORE_PASSWORD")
                .hide_env_values(true)
                .help("store password"),
        )
        .arg(
            Arg::with_name("engine")
                .long("engine")
                .takes_value(true)
                .env("SONGS_ENGINE")
                .help("specify database engine")
                .possible_values(&["sled", "memory"])
                .default_value("sled"),
        )
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .takes_value(true)
                .env("SONGS_ADDR")
                .help("specify the address to listen on")
                .default_value("127.0.0.1:8080"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .env("SONGS_SEED")
                .help("file with the songs loaded at startup")
                .default_value("data/songs.json"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .takes_value(true)
                .env("SONGS_THREADS")
                .help("number of request worker threads")
                .default_value("8")
                .validator(|v| match v.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err("must be a positive integer".to_string()),
                }),
        )
        .arg(
            Arg::with_name("duplicate-check")
                .long("duplicate-check")
                .takes_value(true)
                .env("SONGS_DUPLICATE_CHECK")
                .help("how create requests detect known ids")
                .possible_values(&["seed", "store"])
                .default_value("seed"),
        )
        .get_matches();

    // clap enforces defaults, possible values and the threads validator.
    Config {
        engine: matches.value_of("engine").unwrap_or("sled").to_string(),
        service: matches.value_of("store-service").map(String::from),
        username: matches.value_of("store-username").map(String::from),
        password: matches.value_of("store-password").map(String::from),
        addr: matches.value_of("addr").unwrap_or("127.0.0.1:8080").to_string(),
        seed_path: matches.value_of("seed").unwrap_or("data/songs.json").into(),
        threads: matches
            .value_of("threads")
            .and_then(|t| t.parse().ok())
            .unwrap_or(8),
        duplicate_check: matches
            .value_of("duplicate-check")
            .and_then(|d| d.parse().ok())
            .unwrap_or(DuplicateCheck::Seed),
    }
}

/// parse config -> connect -> seed -> serve
fn run(config: Config) -> Result<()> {
    let url = config.connection_url()?;
    info!("Connecting to '{}'.", url);

    match url.scheme.as_str() {
        songs::sled::SCHEME => serve(SledGateway::connect(&url)?, &config),
        "memory" => serve(MemoryGateway::new(), &config),
        other => Err(SongStoreError::UnknownEngine {
            engine: other.to_string(),
        }),
    }
}

fn serve<G: StoreGateway>(store: G, config: &Config) -> Result<()> {
    let documents: Vec<Song> = songs::seed::load(&config.seed_path)?;
    let known_ids = KnownIds::from_seed(&documents);

    let seeded = documents.len();
    store.seed(documents)?;
    info!(
        "Seeded {} songs ({} distinct ids) from '{}'.",
        seeded,
        known_ids.len()?,
        config.seed_path.display()
    );

    let handlers = Handlers::new(store, known_ids, config.duplicate_check);
    Server::new(handlers, config.threads).listen(&config.addr)
}
