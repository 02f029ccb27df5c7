use meteoswiss_sync::{run_tier, Tier};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    run_tier(Tier::Recent).await
}
