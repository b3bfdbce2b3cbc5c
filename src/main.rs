//! Cars operator binary: initialize the runtime, then run the controller until shutdown.

use anyhow::Result;
use cars_operator::runtime::initialization::initialize;
use cars_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.client,
        init_result.context,
        init_result.server_state,
    )
    .await
}
