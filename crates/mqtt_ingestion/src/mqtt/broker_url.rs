use crate::domain::IngestionError;

const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

/// Parse broker URL in format mqtt://host:port, tcp://host:port, host:port or host
pub fn parse_broker_url(url: &str) -> Result<BrokerAddress, IngestionError> {
    let stripped = url
        .trim()
        .trim_start_matches("mqtt://")
        .trim_start_matches("tcp://")
        .trim_end_matches('/');

    let parts: Vec<&str> = stripped.split(':').collect();
    let (host, port) = match parts.as_slice() {
        [host] => (*host, DEFAULT_MQTT_PORT),
        [host, port] => {
            let port = port.parse::<u16>().map_err(|_| {
                IngestionError::Configuration(format!("invalid port in broker URL: {}", port))
            })?;
            (*host, port)
        }
        _ => {
            return Err(IngestionError::Configuration(format!(
                "invalid broker URL format: {}",
                url
            )));
        }
    };

    if host.is_empty() {
        return Err(IngestionError::Configuration(format!(
            "missing host in broker URL: {}",
            url
        )));
    }

    Ok(BrokerAddress {
        host: host.to_string(),
        port,
    })
}
