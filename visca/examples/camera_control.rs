//! Camera control example
//!
//! Usage:
//!   camera_control serial [device] [baud]
//!   camera_control tcp [ip] [port]
//!   camera_control udp [ip] [port]

use std::time::Duration;
use tokio::time::sleep;
use visca::{Command, Controller, NetworkMode, SerialTransport, TcpTransport, UdpTransport};

#[tokio::main]
async fn main() -> visca::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let kind = args.get(1).map(String::as_str).unwrap_or("serial");

    let controller = match kind {
        "serial" => {
            let device = args.get(2).map(String::as_str).unwrap_or("/dev/ttyUSB0");
            let baud = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(9600);
            println!("Serial: {device} at {baud} baud");
            Controller::new(SerialTransport::new(device, baud))
        }
        "tcp" | "udp" => {
            let ip = args.get(2).map(String::as_str).unwrap_or("192.168.1.100");
            let port = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(5678);
            println!("{}: {ip}:{port} (client mode)", kind.to_uppercase());
            if kind == "tcp" {
                Controller::new(TcpTransport::new(ip, port, NetworkMode::Client))
            } else {
                Controller::new(UdpTransport::new(ip, port, NetworkMode::Client))
            }
        }
        other => {
            eprintln!("Unknown connection type: {other}");
            std::process::exit(1);
        }
    };

    controller.connect().await?;
    println!("Connected to camera");

    // Power on and give the camera time to initialize
    println!("Powering on...");
    controller.execute(&Command::power_on(1)).await?;
    sleep(Duration::from_secs(2)).await;

    let version = controller.version_info().await?;
    println!("Camera version: {version}");

    // Zoom in for two seconds
    println!("Zooming in...");
    controller.execute(&Command::zoom_tele_variable(1, 3)).await?;
    sleep(Duration::from_secs(2)).await;
    controller.execute(&Command::zoom_stop(1)).await?;

    let zoom = controller.zoom_position().await?;
    println!("Zoom position: {zoom}");

    println!("Setting auto focus...");
    controller.execute(&Command::focus_auto(1)).await?;

    // Zoom back out
    println!("Zooming out...");
    controller.execute(&Command::zoom_wide_variable(1, 3)).await?;
    sleep(Duration::from_secs(2)).await;
    controller.execute(&Command::zoom_stop(1)).await?;

    controller.disconnect().await;
    println!("Done");

    Ok(())
}
