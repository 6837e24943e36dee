use crate::models::bucket::BucketEndpoint;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Buckets crawled when neither `--buckets` nor `ENVIDAT_BUCKETS` is given.
pub const DEFAULT_BUCKETS: [&str; 5] = [
    "https://os.zhdk.cloud.switch.ch/envidat-doi/",
    "https://os.zhdk.cloud.switch.ch/envicloud/",
    "https://s3-zh.os.switch.ch/pointclouds",
    "https://s3-zh.os.switch.ch/drone-data",
    "https://os.zhdk.cloud.switch.ch/edna/",
];

pub const DEFAULT_OUT: &str = "all_s3_files.csv";
pub const DEFAULT_OUT_PREFIX: &str = "envidat_viz";

/// Settings for the crawl stage.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoints: Vec<BucketEndpoint>,
    pub out: PathBuf,
    pub page_delay: Duration,
    pub max_pages: Option<usize>,
}

/// Settings for the aggregation stage.
#[derive(Debug, Clone)]
pub struct VisualizeConfig {
    pub csv: PathBuf,
    pub out_prefix: String,
    pub top_n_extensions: Option<usize>,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; flags win over env.
#[derive(Debug, Clone)]
pub enum AppConfig {
    Fetch(FetchConfig),
    Visualize(VisualizeConfig),
    RunAll(FetchConfig, VisualizeConfig),
}

/// Command-line configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "EnviDat S3 listing crawler and file-type aggregator")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch S3 listings and save them to CSV
    Fetch(FetchArgs),
    /// Aggregate an existing CSV produced by fetch
    Visualize(VisualizeArgs),
    /// Run fetch then visualize in sequence
    RunAll(RunAllArgs),
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Comma-separated bucket root URLs (overrides ENVIDAT_BUCKETS)
    #[arg(long)]
    pub buckets: Option<String>,

    /// Output CSV path (overrides ENVIDAT_OUT)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Seconds to sleep between page requests (overrides ENVIDAT_SLEEP_SECS)
    #[arg(long)]
    pub sleep: Option<f64>,

    /// Limit pages per bucket (overrides ENVIDAT_MAX_PAGES)
    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct VisualizeArgs {
    /// CSV path produced by fetch
    #[arg(long)]
    pub csv: PathBuf,

    #[command(flatten)]
    pub output: AggregateArgs,
}

#[derive(clap::Args, Debug)]
pub struct AggregateArgs {
    /// Prefix for output files (overrides ENVIDAT_OUT_PREFIX)
    #[arg(long)]
    pub out_prefix: Option<String>,

    /// Collapse extensions to the top N and group the rest (overrides ENVIDAT_TOP_N_EXTENSIONS)
    #[arg(long)]
    pub top_n_extensions: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct RunAllArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub output: AggregateArgs,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name))
    }

    /// Merge parsed args with an environment lookup.
    pub fn resolve<E>(args: Args, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Result<String, env::VarError>,
    {
        let cfg = match args.command {
            Command::Fetch(fetch) => AppConfig::Fetch(fetch_config(fetch, &env)?),
            Command::Visualize(vis) => {
                AppConfig::Visualize(visualize_config(vis.csv, vis.output, &env)?)
            }
            Command::RunAll(all) => {
                let fetch = fetch_config(all.fetch, &env)?;
                let vis = visualize_config(fetch.out.clone(), all.output, &env)?;
                AppConfig::RunAll(fetch, vis)
            }
        };
        Ok(cfg)
    }
}

fn fetch_config<E>(args: FetchArgs, env: &E) -> Result<FetchConfig>
where
    E: Fn(&str) -> Result<String, env::VarError>,
{
    let buckets = match args.buckets {
        Some(list) => list,
        None => env_string(env, "ENVIDAT_BUCKETS")?.unwrap_or_else(|| DEFAULT_BUCKETS.join(",")),
    };
    let endpoints = BucketEndpoint::parse_list(&buckets).context("parsing bucket list")?;
    if endpoints.is_empty() {
        bail!("no bucket endpoints configured");
    }

    let out = match args.out {
        Some(out) => out,
        None => env_string(env, "ENVIDAT_OUT")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT)),
    };

    let sleep = match args.sleep {
        Some(secs) => secs,
        None => env_parse::<f64, _>(env, "ENVIDAT_SLEEP_SECS")?.unwrap_or(0.0),
    };
    let page_delay = Duration::try_from_secs_f64(sleep)
        .with_context(|| format!("invalid sleep value `{}`", sleep))?;

    let max_pages = match args.max_pages {
        Some(n) => Some(n),
        None => env_parse(env, "ENVIDAT_MAX_PAGES")?,
    };

    Ok(FetchConfig {
        endpoints,
        out,
        page_delay,
        max_pages,
    })
}

fn visualize_config<E>(csv: PathBuf, args: AggregateArgs, env: &E) -> Result<VisualizeConfig>
where
    E: Fn(&str) -> Result<String, env::VarError>,
{
    let out_prefix = match args.out_prefix {
        Some(prefix) => prefix,
        None => env_string(env, "ENVIDAT_OUT_PREFIX")?
            .unwrap_or_else(|| DEFAULT_OUT_PREFIX.to_string()),
    };
    let top_n_extensions = match args.top_n_extensions {
        Some(n) => Some(n),
        None => env_parse(env, "ENVIDAT_TOP_N_EXTENSIONS")?,
    };

    Ok(VisualizeConfig {
        csv,
        out_prefix,
        top_n_extensions,
    })
}

fn env_string<E>(env: &E, name: &str) -> Result<Option<String>>
where
    E: Fn(&str) -> Result<String, env::VarError>,
{
    match env(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn env_parse<T, E>(env: &E, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    E: Fn(&str) -> Result<String, env::VarError>,
{
    env_string(env, name)?
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(argv: &[&str], vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let args = Args::try_parse_from(argv)?;
        AppConfig::resolve(args, |name| vars.get(name).cloned().ok_or(env::VarError::NotPresent))
    }

    #[test]
    fn fetch_defaults() {
        let AppConfig::Fetch(cfg) = resolve(&["inv", "fetch"], &[]).unwrap() else {
            panic!("expected fetch config");
        };
        assert_eq!(cfg.endpoints.len(), DEFAULT_BUCKETS.len());
        assert_eq!(cfg.endpoints[0].name(), "envidat-doi");
        assert_eq!(cfg.out, PathBuf::from(DEFAULT_OUT));
        assert_eq!(cfg.page_delay, Duration::ZERO);
        assert_eq!(cfg.max_pages, None);
    }

    #[test]
    fn flags_override_env() {
        let AppConfig::Fetch(cfg) = resolve(
            &["inv", "fetch", "--buckets", "https://h/a/,https://h/b", "--max-pages", "2"],
            &[("ENVIDAT_BUCKETS", "https://h/c/"), ("ENVIDAT_MAX_PAGES", "9"), ("ENVIDAT_SLEEP_SECS", "0.5")],
        )
        .unwrap() else {
            panic!("expected fetch config");
        };
        let names: Vec<_> = cfg.endpoints.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(cfg.max_pages, Some(2));
        assert_eq!(cfg.page_delay, Duration::from_millis(500));
    }

    #[test]
    fn invalid_env_value_is_an_error() {
        let err = resolve(&["inv", "fetch"], &[("ENVIDAT_MAX_PAGES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("ENVIDAT_MAX_PAGES"));
    }

    #[test]
    fn negative_sleep_is_rejected() {
        assert!(resolve(&["inv", "fetch", "--sleep=-1"], &[]).is_err());
    }

    #[test]
    fn run_all_visualizes_the_fetched_csv() {
        let AppConfig::RunAll(fetch, vis) = resolve(
            &["inv", "run-all", "--out", "data/out.csv", "--top-n-extensions", "5"],
            &[("ENVIDAT_OUT_PREFIX", "viz/run")],
        )
        .unwrap() else {
            panic!("expected run-all config");
        };
        assert_eq!(vis.csv, fetch.out);
        assert_eq!(vis.csv, PathBuf::from("data/out.csv"));
        assert_eq!(vis.out_prefix, "viz/run");
        assert_eq!(vis.top_n_extensions, Some(5));
    }

    #[test]
    fn visualize_requires_csv() {
        assert!(resolve(&["inv", "visualize"], &[]).is_err());
        let AppConfig::Visualize(vis) = resolve(&["inv", "visualize", "--csv", "x.csv"], &[]).unwrap()
        else {
            panic!("expected visualize config");
        };
        assert_eq!(vis.out_prefix, DEFAULT_OUT_PREFIX);
        assert_eq!(vis.top_n_extensions, None);
    }
}
