//! CLI entry point: one search, one job, criteria from the environment.

use igr_fetcher::{utils, App, AppResult, Config, SearchCriteria};

#[tokio::main]
async fn main() -> AppResult<()> {
    utils::logging::init();

    let config = Config::from_env();
    let app = App::initialize(config)?;

    let criteria = SearchCriteria {
        year: env_required("YEAR"),
        district: env_required("DISTRICT"),
        tahsil: env_required("TAHSIL"),
        village: env_required("VILLAGE"),
        property_no: env_required("PROPERTY_NO"),
    };

    let job = app.run_to_completion(criteria).await?;
    if job.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn env_required(name: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            eprintln!("missing required env var {}", name);
            std::process::exit(2);
        }
    }
}
