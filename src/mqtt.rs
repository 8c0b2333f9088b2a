//! MQTT configuration feed
//!
//! Subscribes to a topic and forwards every JSON snapshot published there to
//! the frame loop. Payloads that fail to parse are logged and dropped.

use crate::config::{ConfigSource, RemoteConfig};
use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "demoreel/config";
const CLIENT_ID: &str = "demoreel";
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Background subscriber; the thread ends when the frame loop drops its receiver
pub struct ConfigFeed {
    _thread: thread::JoinHandle<()>,
}

impl ConfigFeed {
    /// Connect and subscribe. Fails fast if the broker is unreachable.
    ///
    /// `host` may carry a port as `host:port`.
    pub fn connect(
        host: &str,
        topic: &str,
        sender: Sender<(ConfigSource, RemoteConfig)>,
    ) -> anyhow::Result<Self> {
        let (host, port) = split_host(host)?;
        let mut options = MqttOptions::new(CLIENT_ID, host.as_str(), port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut connection) = Client::new(options, 10);
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .with_context(|| format!("subscribing to '{}'", topic))?;

        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(anyhow!(e)).with_context(|| format!("connecting to MQTT broker {}:{}", host, port));
            },
            None => return Err(anyhow!("MQTT broker {}:{} closed the connection", host, port)),
        }

        let loop_topic = topic.to_string();
        let handle = thread::spawn(move || {
            // Keeps the client alive for as long as the connection is polled
            let _client = client;
            Self::message_loop(&mut connection, &sender, &loop_topic);
        });

        info!("MQTT connected to {}:{}, listening on '{}'", host, port, topic);
        Ok(Self { _thread: handle })
    }

    fn message_loop(
        connection: &mut Connection,
        sender: &Sender<(ConfigSource, RemoteConfig)>,
        topic: &str,
    ) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    let Some(config) = parse_payload(&publish.payload) else {
                        continue;
                    };
                    if sender.send((ConfigSource::Mqtt, config)).is_err() {
                        debug!("Frame loop gone, MQTT feed exiting");
                        break;
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // rumqttc reconnects on the next poll
                    warn!("MQTT error: {}", e);
                    thread::sleep(Duration::from_secs(1));
                },
            }
        }
    }
}

fn split_host(host: &str) -> anyhow::Result<(String, u16)> {
    match host.rsplit_once(':') {
        Some((name, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("bad MQTT port in '{}'", host))?;
            Ok((name.to_string(), port))
        },
        None => Ok((host.to_string(), DEFAULT_PORT)),
    }
}

fn parse_payload(payload: &[u8]) -> Option<RemoteConfig> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text.trim(),
        Err(e) => {
            warn!("Ignoring non-UTF-8 MQTT payload: {}", e);
            return None;
        },
    };
    if text.is_empty() {
        return None;
    }
    match RemoteConfig::from_json(text) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Ignoring MQTT payload: {:#}", e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host() {
        assert_eq!(split_host("broker.local").expect("host"), ("broker.local".to_string(), 1883));
        assert_eq!(split_host("10.0.0.2:1884").expect("host"), ("10.0.0.2".to_string(), 1884));
        assert!(split_host("broker:http").is_err());
    }

    #[test]
    fn test_parse_payload() {
        let config = parse_payload(br#" { "general": { "effectDuration": 5000 } } "#).expect("config");
        assert_eq!(config.general.effect_secs(), Some(5.0));
        assert!(parse_payload(b"   ").is_none());
        assert!(parse_payload(b"not json").is_none());
        assert!(parse_payload(&[0xFF, 0xFE]).is_none());
    }
}
