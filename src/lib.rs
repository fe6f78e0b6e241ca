// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use bus::{BusTransport, Transaction, TransactionBuilder};
pub use config::{load_config, HubConfig};
pub use errors::{BusError, SensorError, SensorResult, StartupError};
pub use registry::init_sensor;
pub use scheduler::spawn_sampling_task;
pub use sensors::mpu6050::Mpu6050;

use crate::config::CONFIG_FILE;
use crate::scheduler::print_messages;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Samples buffered between the sampler and the printer
const OUTPUT_BUFFER: usize = 16;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Run the sensor hub with the configuration found in `config_dir`
pub async fn run_sensor_hub(config_dir: &str) -> Result<(), StartupError> {
    info!("[mpu6050-sensorhub] starting up...");

    let config_path = format!("{}/{}", config_dir, CONFIG_FILE);
    let config = load_config(&config_path)?;
    info!(
        "[config] loaded {}: bus '{}' ({}), sensor '{}'",
        config_path, config.bus.id, config.bus.r#type, config.sensor.id
    );

    // Identity or configuration failure ends the process before sampling starts
    let sensor = match init_sensor(&config) {
        Ok(sensor) => sensor,
        Err(e) => {
            error!("[registry] {}", e);
            return Err(e);
        }
    };
    info!("[registry] sensor initialized");

    let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
    let sampler = spawn_sampling_task(sensor, &config.sampling, tx);
    let printed = print_messages(rx, config.sampling.format).await;

    match sampler.await {
        Ok(samples) => info!("[main] sampling ended: {} sample(s), {} printed", samples, printed),
        Err(e) => error!("[main] sampling task failed: {}", e),
    }
    Ok(())
}
