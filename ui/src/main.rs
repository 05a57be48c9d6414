pub use app::App;

pub mod app;
mod complete_profile;
mod data;
mod form;
mod home;
mod login;
mod storage;

use std::sync::Arc;

use canstory::{Api, Config};
use cli_log::*;
use client::client::Client;

use crate::storage::KeyringStorage;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    init_cli_log!("canstory");
    color_eyre::install()?;
    let config = Config::from_env()?;

    let client = Arc::new(Client::with_storage(
        config.client_config(),
        Arc::new(KeyringStorage::new()?),
    ));
    let refresher = client.spawn_auto_refresh();
    let api = Api::new(client);
    let bootstrap = api.start();

    let terminal = ratatui::init();
    let result = App::new(api, config.language).run(terminal).await;
    ratatui::restore();

    drop(bootstrap);
    refresher.abort();
    result
}
