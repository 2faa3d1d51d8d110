use bacscan_proxy::{Proxy, ProxyService};
use bacscan_tools::{parse_value_arg, ProxyArgs, ValueKindArg};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "bacscan", about = "Discover and query BACnet/IP devices")]
struct Cli {
    #[command(flatten)]
    proxy: ProxyArgs,
    /// Local address to bind; defaults to the outbound interface.
    #[arg(long)]
    bind: Option<Ipv4Addr>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read JSON control requests from stdin, one per line, against one
    /// long-lived proxy. Send `{"op":"start"}` first.
    Control,
    #[command(flatten)]
    Query(Query),
}

#[derive(Subcommand, Debug)]
enum Query {
    /// Who-Is every device in an IPv4 block, e.g. 192.168.1.0/24.
    Scan {
        network: String,
        #[arg(long)]
        window_ms: Option<u64>,
    },
    /// Who-Is with optional instance limits and destination.
    WhoIs {
        #[arg(long)]
        low: Option<u32>,
        #[arg(long)]
        high: Option<u32>,
        #[arg(long)]
        destination: Option<String>,
    },
    /// Read one property, e.g. `read 192.168.1.20 analog-input:1 present-value`.
    Read {
        device: String,
        object: String,
        property: String,
        #[arg(long)]
        index: Option<u32>,
    },
    /// Write one property; `null` relinquishes at the given priority.
    Write {
        device: String,
        object: String,
        property: String,
        value: String,
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        index: Option<u32>,
        #[arg(long, value_enum)]
        value_type: Option<ValueKindArg>,
    },
    /// Read the object list and common properties of every object.
    Device { device: String, instance: String },
    /// List a device's objects as points.
    Points { device: String, instance: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let service = ProxyService::new(Proxy::new(cli.proxy.to_config()));

    let query = match cli.command {
        Command::Control => return control(&service).await,
        Command::Query(query) => query,
    };

    let bind = cli.bind.map(|ip| ip.to_string());
    let started = service.start(bind.as_deref()).await;
    if !started.is_done() {
        println!("{}", serde_json::to_string_pretty(&started.to_json())?);
        std::process::exit(1);
    }

    let reply = run(&service, query).await;
    service.stop().await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    if reply["status"] != "done" {
        std::process::exit(1);
    }
    Ok(())
}

async fn run(service: &ProxyService, query: Query) -> Value {
    match query {
        Query::Scan { network, window_ms } => service
            .scan(&network, window_ms.map(Duration::from_millis))
            .await
            .to_json(),
        Query::WhoIs {
            low,
            high,
            destination,
        } => service
            .who_is(low, high, destination.as_deref())
            .await
            .to_json(),
        Query::Read {
            device,
            object,
            property,
            index,
        } => service
            .read_property(&device, &object, &property, index)
            .await
            .to_json(),
        Query::Write {
            device,
            object,
            property,
            value,
            priority,
            index,
            value_type,
        } => {
            let kind = value_type.map(|arg| arg.into_value_kind().name());
            service
                .write_property(
                    &device,
                    &object,
                    &property,
                    &parse_value_arg(&value),
                    priority,
                    index,
                    kind,
                )
                .await
                .to_json()
        }
        Query::Device { device, instance } => {
            service.read_device_all(&device, &instance).await.to_json()
        }
        Query::Points { device, instance } => service.points(&device, &instance).await.to_json(),
    }
}

async fn control(service: &ProxyService) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = service.handle_line(&line).await;
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    log::info!("control input closed");
    service.stop().await;
    Ok(())
}
