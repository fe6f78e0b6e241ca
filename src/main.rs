use mpu6050_sensorhub::config::config_dir;
use mpu6050_sensorhub::{init_tracing, run_sensor_hub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    init_tracing();

    // CONFIG_PATH overrides the default `config` directory
    let config_dir = config_dir();
    tracing::info!("[main] Configuration path: {}", config_dir);

    run_sensor_hub(&config_dir).await?;
    Ok(())
}
