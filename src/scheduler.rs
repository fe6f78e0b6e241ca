use crate::config::{OutputFormat, SamplingEntry};
use crate::messages::{Header, ReadFailureMessage, SampleMessage, SensorMessage};
use crate::sensors::SensorDriver;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEVICE_ID: &str = "mpu6050_hub";

/// Polls an initialized sensor at a fixed period and forwards every outcome to `tx`.
///
/// A failed read becomes a [`ReadFailureMessage`]; the loop keeps going. It ends after
/// `max_samples` samples or once the receiver is gone, returning the number of samples taken.
pub fn spawn_sampling_task(
    sensor: Box<dyn SensorDriver>,
    sampling: &SamplingEntry,
    tx: mpsc::Sender<SensorMessage>,
) -> JoinHandle<u64> {
    let sensor_id = sensor.id().to_string();
    let period = Duration::from_millis(sampling.period_ms);
    let startup_delay = Duration::from_millis(sampling.startup_delay_ms);
    let max_samples = sampling.max_samples;
    // Held for one complete read, so transactions never interleave
    let sensor = Arc::new(Mutex::new(sensor));

    tokio::spawn(async move {
        sleep(startup_delay).await;
        info!("[sampler] {} sampling every {:?}", sensor_id, period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq = 0u64;

        while max_samples.map_or(true, |max| seq < max) {
            ticker.tick().await;
            seq += 1;

            let shared = sensor.clone();
            let result = tokio::task::spawn_blocking(move || {
                let mut guard = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                guard.read()
            })
            .await;

            let h = Header::new(DEVICE_ID.to_string(), sensor_id.clone(), seq);
            let message = match result {
                Ok(Ok(frame)) => match (frame.accel_x, frame.temp) {
                    (Some(accel_x), Some(temperature)) => SensorMessage::Sample(SampleMessage {
                        h,
                        accel_x,
                        accel: frame.accel,
                        temperature,
                    }),
                    _ => failure(h, "incomplete sensor frame".to_string(), false),
                },
                Ok(Err(e)) => failure(h, e.to_string(), e.is_transient()),
                Err(e) => failure(h, format!("sampling task failed: {}", e), false),
            };

            if tx.send(message).await.is_err() {
                debug!("[sampler] {} output closed, stopping", sensor_id);
                break;
            }
        }

        info!("[sampler] {} finished after {} sample(s)", sensor_id, seq);
        seq
    })
}

fn failure(h: Header, reason: String, transient: bool) -> SensorMessage {
    warn!("[sampler] {} sample #{} failed: {}", h.sensor_id, h.seq, reason);
    SensorMessage::ReadFailure(ReadFailureMessage { h, reason, transient })
}

/// Prints messages until the sampler hangs up; returns how many were printed
pub async fn print_messages(mut rx: mpsc::Receiver<SensorMessage>, format: OutputFormat) -> u64 {
    let mut printed = 0;
    while let Some(message) = rx.recv().await {
        let line = match format {
            OutputFormat::Text => message.to_text(),
            OutputFormat::Json => match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("[output] failed to encode sample #{}: {}", message.header().seq, e);
                    continue;
                }
            },
        };
        match message {
            SensorMessage::Sample(_) => println!("{}", line),
            SensorMessage::ReadFailure(_) => eprintln!("{}", line),
        }
        printed += 1;
    }
    printed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::{BusFault, SimulatedMpu6050};
    use crate::sensors::mpu6050::Mpu6050;

    fn sampling(max_samples: Option<u64>) -> SamplingEntry {
        SamplingEntry {
            period_ms: 5,
            startup_delay_ms: 0,
            format: OutputFormat::Text,
            max_samples,
        }
    }

    fn initialized(sim: SimulatedMpu6050) -> Mpu6050<SimulatedMpu6050> {
        let mut imu = Mpu6050::new("imu0".to_string(), 0x68, "sim0".to_string(), sim);
        imu.init().unwrap();
        imu
    }

    #[tokio::test]
    async fn test_samples_until_limit() {
        let mut sim = SimulatedMpu6050::default();
        sim.set_accel_raw([-512, 0, 16384]);
        sim.set_temperature_raw(-3920);

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_sampling_task(Box::new(initialized(sim)), &sampling(Some(3)), tx);

        let mut seqs = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                SensorMessage::Sample(sample) => {
                    assert_eq!(sample.accel_x, -512);
                    assert!((sample.temperature - 25.0).abs() < 0.01);
                    seqs.push(sample.h.seq);
                }
                SensorMessage::ReadFailure(f) => panic!("unexpected failure: {}", f.reason),
            }
        }
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_sample_does_not_stop_the_loop() {
        let mut imu = initialized(SimulatedMpu6050::default());
        imu.transport_mut().inject_fault(BusFault::Timeout);

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_sampling_task(Box::new(imu), &sampling(Some(3)), tx);

        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        assert_eq!(handle.await.unwrap(), 3);
        assert_eq!(messages.len(), 3);

        match &messages[0] {
            SensorMessage::ReadFailure(f) => {
                assert!(f.transient);
                assert!(f.reason.contains("timeout"));
            }
            other => panic!("expected a failure, got {:?}", other),
        }
        assert!(matches!(messages[1], SensorMessage::Sample(_)));
        assert!(matches!(messages[2], SensorMessage::Sample(_)));
    }

    #[tokio::test]
    async fn test_stops_when_output_closes() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = spawn_sampling_task(
            Box::new(initialized(SimulatedMpu6050::default())),
            &sampling(None),
            tx,
        );
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_print_messages_counts_lines() {
        let (tx, rx) = mpsc::channel(4);
        let handle = spawn_sampling_task(
            Box::new(initialized(SimulatedMpu6050::default())),
            &sampling(Some(2)),
            tx,
        );
        assert_eq!(print_messages(rx, OutputFormat::Json).await, 2);
        assert_eq!(handle.await.unwrap(), 2);
    }
}
