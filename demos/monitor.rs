use std::env;

use eos_sauna::{SaunaClient, SnapshotKind};

#[tokio::main]
async fn main() -> eos_sauna::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(address) = args.get(1) else {
        eprintln!("usage: monitor <address> [--https]");
        std::process::exit(2);
    };
    let use_https = args.iter().any(|a| a == "--https");

    let mut builder = SaunaClient::builder(address)
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|snapshot| {
            let values: Vec<String> = snapshot.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("[{}] {}", snapshot.kind, values.join(" "));
        });

    if use_https {
        builder = builder.protocol("https");
    }

    let mut client = builder.build()?;

    println!("Connecting to {address}...");
    client.open().await?;
    if let Some(status) = client.actual_status() {
        println!(
            "Status: {} | {:.1}\u{00b0}C | {:.0}% | action: {:?}",
            status.status.map(|s| s.label()).unwrap_or_default(),
            status.temperature.unwrap_or_default(),
            status.humidity.unwrap_or_default(),
            client.heating_action(),
        );
    }
    println!("Connected. Polling until Ctrl-C...");

    let mut status_rx = client.subscribe(SnapshotKind::ActualStatus);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = async {
                match status_rx.as_mut() {
                    Some(rx) => rx.changed().await.is_ok(),
                    None => false,
                }
            } => {
                if !changed {
                    break;
                }
                if !client.last_update_success(SnapshotKind::ActualStatus)
                    && let Some(e) = client.last_error(SnapshotKind::ActualStatus)
                {
                    eprintln!("status refresh failing: {e}");
                }
            }
        }
    }

    client.close().await;
    Ok(())
}
