//! UDP connection example

use visca::{Controller, NetworkMode, UdpTransport};

#[tokio::main]
async fn main() -> visca::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let ip = std::env::var("CAMERA_IP").unwrap_or_else(|_| "192.168.1.100".to_string());

    let transport = UdpTransport::new(ip, 52381, NetworkMode::Client);
    let controller = Controller::new(transport);

    controller.connect().await?;
    println!("Camera connected!");

    let info = controller.version_info().await?;
    println!("{info}");

    let power = controller.power_state().await?;
    println!("Power: {power}");

    controller.disconnect().await;

    Ok(())
}
