use std::env;

use eos_sauna::{Command, SaunaClient};

fn usage() -> ! {
    eprintln!("usage: control <address> <key> <value>");
    eprintln!("keys:");
    for cmd in Command::ALL {
        match cmd {
            Command::BooleanToggle { key } => eprintln!("  {key}  0|1"),
            Command::BoundedSetpoint { key, min, max } => eprintln!("  {key}  {min}..={max}"),
        }
    }
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> eos_sauna::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let (Some(address), Some(key), Some(value)) = (args.get(1), args.get(2), args.get(3)) else {
        usage();
    };
    let Ok(value) = value.parse::<i64>() else {
        usage();
    };

    let mut client = SaunaClient::builder(address).build()?;
    client.open().await?;
    println!("before: {:?}", client.desired_settings());

    let response = client.send_command(key, value).await?;
    println!("device replied: {response}");

    client.refresh(eos_sauna::SnapshotKind::DesiredSettings).await?;
    println!("after:  {:?}", client.desired_settings());

    client.close().await;
    Ok(())
}
