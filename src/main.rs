use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use foodgram::{
    api::{context::Context, routes::routes},
    error::Error,
    postgres::PgStore,
    Settings,
};

async fn start_server() -> Result<(), Error> {
    let settings = Settings::load()?;
    let store = PgStore::connect(&settings.database_url).await?;
    store.ensure_schema().await?;

    let address = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let context = Context::new(Arc::new(store), settings);

    log::info!("Listening on http://{address}");
    warp::serve(routes(context)).run(address).await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match start_server().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
