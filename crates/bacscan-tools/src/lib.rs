use bacscan_proxy::{ProxyConfig, ValueKind};
use clap::{Args, ValueEnum};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

/// CLI-friendly names for the application types a write can be encoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueKindArg {
    Null,
    Boolean,
    Unsigned,
    Signed,
    Real,
    Double,
    String,
    Enumerated,
    ObjectId,
}

impl ValueKindArg {
    pub const fn into_value_kind(self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Boolean => ValueKind::Boolean,
            Self::Unsigned => ValueKind::Unsigned,
            Self::Signed => ValueKind::Signed,
            Self::Real => ValueKind::Real,
            Self::Double => ValueKind::Double,
            Self::String => ValueKind::CharacterString,
            Self::Enumerated => ValueKind::Enumerated,
            Self::ObjectId => ValueKind::ObjectId,
        }
    }
}

/// Proxy settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ProxyArgs {
    /// Local UDP port; 0 picks an ephemeral port.
    #[arg(long, default_value_t = 47808)]
    pub port: u16,
    /// Port assumed for device addresses given without one.
    #[arg(long, default_value_t = 47808)]
    pub device_port: u16,
    /// Milliseconds to wait for each confirmed reply.
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
    /// Milliseconds to collect I-Am replies after a Who-Is.
    #[arg(long, default_value_t = 3000)]
    pub window_ms: u64,
    /// Extra attempts for reads that time out.
    #[arg(long, default_value_t = 0)]
    pub read_retries: u8,
    /// Skip reading device names after a scan.
    #[arg(long)]
    pub no_names: bool,
    /// Bind the socket on the interface address instead of 0.0.0.0.
    #[arg(long)]
    pub interface_only: bool,
    /// Address used to pick the outbound interface.
    #[arg(long, default_value_t = Ipv4Addr::new(8, 8, 8, 8))]
    pub probe: Ipv4Addr,
}

impl ProxyArgs {
    pub fn to_config(&self) -> ProxyConfig {
        ProxyConfig::default()
            .with_port(self.port)
            .with_device_port(self.device_port)
            .with_response_timeout(Duration::from_millis(self.timeout_ms))
            .with_scan_window(Duration::from_millis(self.window_ms))
            .with_read_retries(self.read_retries)
            .with_resolve_names(!self.no_names)
            .with_bind_interface_only(self.interface_only)
            .with_probe_target(self.probe)
    }
}

/// A value typed on the command line: JSON when it parses as JSON
/// (`72.5`, `true`, `null`), otherwise the literal text.
pub fn parse_value_arg(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_value_arg, ProxyArgs, ValueKindArg};
    use bacscan_proxy::ValueKind;
    use clap::Parser;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        proxy: ProxyArgs,
    }

    #[test]
    fn defaults_match_proxy_defaults() {
        let cli = Cli::parse_from(["bacscan"]);
        assert_eq!(cli.proxy.to_config(), bacscan_proxy::ProxyConfig::default());
    }

    #[test]
    fn flags_map_onto_the_config() {
        let cli = Cli::parse_from([
            "bacscan",
            "--port",
            "0",
            "--timeout-ms",
            "500",
            "--read-retries",
            "2",
            "--no-names",
        ]);
        let config = cli.proxy.to_config();
        assert_eq!(config.port, 0);
        assert_eq!(config.response_timeout, Duration::from_millis(500));
        assert_eq!(config.read_retries, 2);
        assert!(!config.resolve_names);
    }

    #[test]
    fn values_parse_as_json_or_text() {
        assert_eq!(parse_value_arg("72.5"), json!(72.5));
        assert_eq!(parse_value_arg("null"), json!(null));
        assert_eq!(parse_value_arg("active"), json!("active"));
        assert_eq!(parse_value_arg("Lobby AHU"), json!("Lobby AHU"));
    }

    #[test]
    fn kind_names_line_up() {
        assert_eq!(ValueKindArg::String.into_value_kind(), ValueKind::CharacterString);
        assert_eq!(ValueKindArg::ObjectId.into_value_kind().name(), "object-id");
    }
}
