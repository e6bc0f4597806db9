//! Web server command.

use console::style;

use crate::config::Settings;

/// Default port when only a host is given.
const DEFAULT_PORT: u16 = 3040;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let addr = parse_bind_address(bind.unwrap_or(&settings.bind));

    println!(
        "{} Library: {}",
        style("→").cyan(),
        settings.library_dir.display()
    );
    println!(
        "{} Starting printdeck server at http://{}",
        style("→").cyan(),
        addr
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &addr).await
}

/// Parse a bind address that can be:
/// - Just a port: "3040" -> 127.0.0.1:3040
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3040
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
pub fn parse_bind_address(bind: &str) -> String {
    if let Ok(port) = bind.parse::<u16>() {
        return format!("127.0.0.1:{}", port);
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if port_str.parse::<u16>().is_ok() {
            return format!("{}:{}", host, port_str);
        }
    }

    format!("{}:{}", bind, DEFAULT_PORT)
}
