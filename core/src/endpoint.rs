use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{Error, SondeResult};

/// Line sent to a live peer to request its reputation dump. Any other
/// line is taken as a host to probe.
pub const REPUTATION_REQUEST: &str = "r";

/// One entry of a peer's reputation dump: `address probe_trust rec_trust`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub address: String,
    pub probe_trust: i64,
    pub rec_trust: i64,
}

/// Capability a live-network driver needs from a peer: read its reputation
/// table, or order it to probe a host. The simulation core never uses
/// this; it exists for drivers talking to real peer processes.
#[async_trait]
pub trait PeerEndpoint {
    async fn reputations(&mut self) -> SondeResult<Vec<ReputationEntry>>;

    async fn send_probe(&mut self, host: &str) -> SondeResult<()>;
}

/// Parses a one-line reputation dump: comma-separated entries, each
/// `address probe_trust rec_trust`. A blank line is an empty table.
pub fn parse_reputation_dump(line: &str) -> SondeResult<Vec<ReputationEntry>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for raw in line.split(',') {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(Error::Protocol(format!("Bad reputation entry: {}", raw)));
        }

        let parse = |value: &str| {
            value
                .parse::<i64>()
                .map_err(|_| Error::Protocol(format!("Bad trust value: {}", value)))
        };

        entries.push(ReputationEntry {
            address: fields[0].to_string(),
            probe_trust: parse(fields[1])?,
            rec_trust: parse(fields[2])?,
        });
    }
    Ok(entries)
}

pub fn format_reputation_dump(entries: &[ReputationEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} {} {}",
                entry.address, entry.probe_trust, entry.rec_trust
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Hostname check for probe orders: dot-separated labels, alphanumeric
/// ends, hyphens only inside.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty() && host.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

/// Adapter over a spawned peer process speaking the line protocol on its
/// standard streams.
pub struct ProcessEndpoint {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessEndpoint {
    /// Driving a live peer requires the credential exchange that proves
    /// who is on the other end of the pipe; that exchange does not exist
    /// yet, and an unverified peer must not be driven.
    pub fn connect(_command: Command) -> SondeResult<Self> {
        Err(Error::Unsupported(
            "peer identity verification is not implemented".to_string(),
        ))
    }

    pub async fn shutdown(mut self) -> SondeResult<()> {
        self.child.kill().await?;
        Ok(())
    }
}

#[async_trait]
impl PeerEndpoint for ProcessEndpoint {
    async fn reputations(&mut self) -> SondeResult<Vec<ReputationEntry>> {
        self.stdin
            .write_all(format!("{}\n", REPUTATION_REQUEST).as_bytes())
            .await?;
        self.stdin.flush().await?;

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).await?;
        if read == 0 {
            return Err(Error::Endpoint(
                "peer process closed its output".to_string(),
            ));
        }
        parse_reputation_dump(&line)
    }

    async fn send_probe(&mut self, host: &str) -> SondeResult<()> {
        if !is_valid_host(host) {
            return Err(Error::Protocol(format!("Bad host format: {}", host)));
        }

        self.stdin.write_all(format!("{}\n", host).as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}
