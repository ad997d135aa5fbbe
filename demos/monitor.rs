use std::env;

use tuya_pool_heatpump::{HeatPumpState, MessageLogMode, PlatformConfig, Poller, TuyaClient};

#[tokio::main]
async fn main() -> tuya_pool_heatpump::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .expect("usage: monitor <config.json> [--log <path>]");
    let log_path = args
        .iter()
        .position(|a| a == "--log")
        .and_then(|i| args.get(i + 1));

    let config = PlatformConfig::from_path(config_path)?;
    let interval = config.options.poll_interval();

    let mut builder = TuyaClient::builder(config.options.credentials.clone());
    if let Some(path) = log_path {
        println!("Logging requests/responses to {path}");
        builder = builder.message_log(MessageLogMode::Redacted, path);
    }
    let client = builder.build()?;

    let mut poller = Poller::new(client)
        .interval(interval)
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|device_id, status| {
            let state = HeatPumpState::from_status(status);
            let fmt_temp = |t: Option<tuya_pool_heatpump::Temperature>| {
                t.map(|t| t.to_string()).unwrap_or_else(|| "-".into())
            };
            println!(
                "[{device_id}] on: {:?} | mode: {} | water: {} | target: {}",
                state.active,
                state.mode.as_deref().unwrap_or("-"),
                fmt_temp(state.current_temperature),
                fmt_temp(state.target_temperature()),
            );
        });

    for device in &config.devices {
        println!("Watching {} ({})", device.name, device.id);
        poller = poller.device(&device.id);
    }

    println!("Polling every {}s...", interval.as_secs());
    poller.run().await;
    Ok(())
}
