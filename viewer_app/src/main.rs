//! Model viewer
//!
//! Shows three textured models around the origin. WASD moves the camera,
//! the arrow keys turn it, R toggles the spin and Delete removes the most
//! recently added model.

mod viewer;

use std::error::Error;
use std::path::Path;

use cake_engine::config::{Config, EngineConfig};
use cake_engine::foundation::logging;
use cake_engine::Engine;

use viewer::Viewer;

const CONFIG_PATH: &str = "viewer.toml";

fn load_config() -> Result<EngineConfig, Box<dyn Error>> {
    if Path::new(CONFIG_PATH).exists() {
        log::info!("Loading configuration from {}", CONFIG_PATH);
        Ok(EngineConfig::load_from_file(CONFIG_PATH)?)
    } else {
        log::info!("No {} found, using defaults", CONFIG_PATH);
        Ok(EngineConfig::default())
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    let mut engine = Engine::new(config)?;
    let mut viewer = Viewer::new();
    engine.run(&mut viewer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    log::info!("Starting Cake viewer");

    if let Err(e) = run() {
        log::error!("Fatal error: {}", e);
        return Err(e);
    }
    Ok(())
}
