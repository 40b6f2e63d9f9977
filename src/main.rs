pub mod app;
pub mod renderer;

use clap::Parser;
use color_eyre::Result;
use app::App;
use renderer::config::RenderConfig;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let config = RenderConfig::parse();
    log::debug!("{:?}", config);

    let app = App::new(config)?;
    app.run()?;

    Ok(())
}
