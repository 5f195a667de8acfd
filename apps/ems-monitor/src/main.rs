//! 遥测监控进程：加载配置 → 组装 Sink 与设备 → 轮询或回放。

use ems_config::{AppConfig, DeviceKind, DeviceSettings, FailurePolicyKind, RunMode, SinkKind};
use ems_device::{Device, InverterDevice, ReplayDevice, ReplaySettings};
use ems_monitor::{FailurePolicy, Monitor, MonitorConfig};
use ems_storage::{InMemorySink, PgSink, Sink};
use ems_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let sink = build_sink(&config).await?;
    let monitor_config = MonitorConfig {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        failure_policy: match config.failure_policy {
            FailurePolicyKind::Abort => FailurePolicy::AbortCycle,
            FailurePolicyKind::Skip => FailurePolicy::SkipDevice,
        },
    };
    let mut monitor = Monitor::with_config(sink, monitor_config);
    for (index, settings) in config.devices.iter().enumerate() {
        monitor.register(build_device(&config, index, settings))?;
    }

    match config.run_mode {
        RunMode::Replay => {
            let summary = monitor.run_from_replay_source(&config.replay_path).await?;
            info!(frames = summary.frames, records = summary.records, "replay complete");
        }
        RunMode::Poll => {
            tokio::select! {
                result = monitor.run_forever() => {
                    match result {
                        Ok(never) => match never {},
                        Err(err) => {
                            log_metrics();
                            return Err(err.into());
                        }
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("shutdown requested");
                }
            }
        }
    }

    log_metrics();
    Ok(())
}

async fn build_sink(config: &AppConfig) -> Result<Arc<dyn Sink>, Box<dyn std::error::Error>> {
    match config.sink {
        SinkKind::Memory => {
            warn!("using in-memory sink; records are not persisted");
            Ok(Arc::new(InMemorySink::new()))
        }
        SinkKind::Postgres => {
            // Postgres 时序存储（启动时建表）
            let url = config
                .database_url
                .as_deref()
                .ok_or("EMS_DATABASE_URL is required for postgres sink")?;
            let sink = PgSink::connect(url).await?;
            sink.ensure_schema().await?;
            Ok(Arc::new(sink))
        }
    }
}

fn build_device(config: &AppConfig, index: usize, settings: &DeviceSettings) -> Box<dyn Device> {
    let identity = settings.identity.clone();
    match settings.kind {
        DeviceKind::Inverter => Box::new(InverterDevice::over_tcp(
            identity,
            settings.request_command.clone(),
        )),
        DeviceKind::Replay => {
            let replay = ReplaySettings {
                lookback: Duration::from_secs(config.replay_lookback_seconds),
                step: Duration::from_secs(config.replay_step_seconds),
                stride: config.replay_stride,
            };
            // 回放模式下帧由监控循环注入第一个设备
            if config.run_mode == RunMode::Replay && index == 0 {
                Box::new(ReplayDevice::injected(identity, replay))
            } else {
                Box::new(ReplayDevice::from_file(
                    identity,
                    config.replay_path.clone(),
                    replay,
                ))
            }
        }
    }
}

fn log_metrics() {
    let snapshot = metrics().snapshot();
    info!(
        cycles_completed = snapshot.cycles_completed,
        cycles_failed = snapshot.cycles_failed,
        records_committed = snapshot.records_committed,
        acquisition_failures = snapshot.acquisition_failures,
        malformed_frames = snapshot.malformed_frames,
        sink_failures = snapshot.sink_failures,
        "monitor metrics"
    );
}
