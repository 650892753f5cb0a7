//! Slot counter store speaking the Redis serialization protocol.
//!
//! Only the handful of commands the allocator needs are implemented:
//! `SET .. NX`, `DECRBY`, `INCRBY`, `GET`, `DEL` and `PING`. Each of them is
//! a single atomic operation on the server, which is all the slot contract
//! relies on.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{AcquireOutcome, AllocatorError, SlotAllocator};
use crate::domain::SimulationId;

/// Reply frames of RESP2 that the allocator can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

/// Redis key holding the slot counter of a simulation.
pub fn slot_key(id: SimulationId) -> String {
    format!("simulation:{id}:slots")
}

/// Slot store backed by a Redis-compatible server.
///
/// Holds one lazily opened connection. Every command is bounded by the
/// operation timeout and never retried; a connection that fails or times out
/// is dropped and reopened by the next call.
///
/// `DECRBY` and `INCRBY` create a missing key, so `try_acquire` and `release`
/// on a never-initialized or cleared id leave a counter without the configured
/// expiry behind instead of failing with `NotInitialized`.
pub struct RespSlotStore {
    address: String,
    timeout: Duration,
    counter_ttl: Option<Duration>,
    connection: Mutex<Option<BufStream<TcpStream>>>,
}

impl RespSlotStore {
    /// Creates a store for the server at `address` without connecting yet.
    pub fn new(address: String, timeout: Duration, counter_ttl: Option<Duration>) -> Self {
        Self {
            address,
            timeout,
            counter_ttl,
            connection: Mutex::new(None),
        }
    }

    /// Checks that the server answers.
    ///
    /// # Errors
    ///
    /// - `AllocatorError::Timeout` / `AllocatorError::Unavailable` - If the server cannot be reached
    /// - `AllocatorError::Protocol` - If the server does not answer `PONG`
    pub async fn ping(&self) -> Result<(), AllocatorError> {
        match self.execute("PING", &["PING"]).await? {
            Reply::Simple(pong) if pong == "PONG" => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    async fn open(&self) -> Result<BufStream<TcpStream>, AllocatorError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| AllocatorError::Unavailable {
                reason: format!("Failed to connect to {}: {e}", self.address),
            })?;
        stream.set_nodelay(true).map_err(io_unavailable)?;
        tracing::debug!(address = %self.address, "Opened slot store connection");
        Ok(BufStream::new(stream))
    }

    /// Sends one command and reads its reply within the operation timeout.
    async fn execute(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> Result<Reply, AllocatorError> {
        let mut connection = self.connection.lock().await;

        let round_trip = async {
            let mut stream = match connection.take() {
                Some(stream) => stream,
                None => self.open().await?,
            };
            stream
                .write_all(&encode_command(args))
                .await
                .map_err(io_unavailable)?;
            stream.flush().await.map_err(io_unavailable)?;
            let reply = read_reply(&mut stream).await?;
            // Only a connection that completed the exchange is reused
            *connection = Some(stream);
            Ok::<Reply, AllocatorError>(reply)
        };

        let reply = tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|_| AllocatorError::Timeout {
                operation,
                timeout: self.timeout,
            })??;

        match reply {
            Reply::Error(message) => Err(AllocatorError::Protocol {
                reason: format!("{operation} failed: {message}"),
            }),
            reply => Ok(reply),
        }
    }

    async fn execute_integer(
        &self,
        operation: &'static str,
        args: &[&str],
    ) -> Result<i64, AllocatorError> {
        match self.execute(operation, args).await? {
            Reply::Integer(value) => Ok(value),
            other => Err(unexpected(operation, &other)),
        }
    }
}

#[async_trait]
impl SlotAllocator for RespSlotStore {
    async fn init(&self, id: SimulationId, capacity: u64) -> Result<(), AllocatorError> {
        let key = slot_key(id);
        let capacity = capacity.to_string();
        let ttl_millis = self.counter_ttl.map(|ttl| ttl.as_millis().to_string());

        let mut args = vec!["SET", key.as_str(), capacity.as_str(), "NX"];
        if let Some(ref millis) = ttl_millis {
            args.push("PX");
            args.push(millis.as_str());
        }

        match self.execute("SET", &args).await? {
            Reply::Simple(ok) if ok == "OK" => Ok(()),
            Reply::Bulk(None) => Err(AllocatorError::AlreadyInitialized { id }),
            other => Err(unexpected("SET", &other)),
        }
    }

    async fn try_acquire(
        &self,
        id: SimulationId,
        n: u64,
    ) -> Result<AcquireOutcome, AllocatorError> {
        let key = slot_key(id);
        let amount = n.to_string();

        let after = self
            .execute_integer("DECRBY", &["DECRBY", key.as_str(), amount.as_str()])
            .await?;
        if after < 0 {
            self.execute_integer("INCRBY", &["INCRBY", key.as_str(), amount.as_str()])
                .await?;
            return Ok(AcquireOutcome::Denied);
        }

        Ok(AcquireOutcome::Granted)
    }

    async fn release(&self, id: SimulationId, n: u64) -> Result<(), AllocatorError> {
        let key = slot_key(id);
        let amount = n.to_string();
        self.execute_integer("INCRBY", &["INCRBY", key.as_str(), amount.as_str()])
            .await?;
        Ok(())
    }

    async fn remaining(&self, id: SimulationId) -> Result<Option<i64>, AllocatorError> {
        let key = slot_key(id);
        match self.execute("GET", &["GET", key.as_str()]).await? {
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(raw)) => std::str::from_utf8(&raw)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .map(Some)
                .ok_or_else(|| AllocatorError::Protocol {
                    reason: format!("Counter {key} does not hold an integer"),
                }),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn clear(&self, id: SimulationId) -> Result<(), AllocatorError> {
        let key = slot_key(id);
        self.execute_integer("DEL", &["DEL", key.as_str()]).await?;
        Ok(())
    }
}

fn io_unavailable(error: std::io::Error) -> AllocatorError {
    AllocatorError::Unavailable {
        reason: error.to_string(),
    }
}

fn unexpected(operation: &str, reply: &Reply) -> AllocatorError {
    AllocatorError::Protocol {
        reason: format!("Unexpected reply to {operation}: {reply:?}"),
    }
}

/// Encodes a command as a RESP array of bulk strings.
fn encode_command(args: &[&str]) -> BytesMut {
    let payload: usize = args.iter().map(|arg| arg.len() + 16).sum();
    let mut buffer = BytesMut::with_capacity(16 + payload);
    buffer.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buffer.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buffer.put_slice(arg.as_bytes());
        buffer.put_slice(b"\r\n");
    }
    buffer
}

/// Reads one CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, AllocatorError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader
        .read_until(b'\n', &mut line)
        .await
        .map_err(io_unavailable)?;
    if read == 0 {
        return Err(AllocatorError::Unavailable {
            reason: "Connection closed by store".to_string(),
        });
    }
    if !line.ends_with(b"\r\n") {
        return Err(AllocatorError::Protocol {
            reason: "Unterminated reply line".to_string(),
        });
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_number(body: &[u8]) -> Result<i64, AllocatorError> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or_else(|| AllocatorError::Protocol {
            reason: format!("Invalid integer in reply: {}", String::from_utf8_lossy(body)),
        })
}

/// Reads a single reply frame.
async fn read_reply<R>(reader: &mut R) -> Result<Reply, AllocatorError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let Some((&marker, body)) = line.split_first() else {
        return Err(AllocatorError::Protocol {
            reason: "Empty reply".to_string(),
        });
    };

    match marker {
        b'+' => Ok(Reply::Simple(String::from_utf8_lossy(body).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(body).into_owned())),
        b':' => Ok(Reply::Integer(parse_number(body)?)),
        b'$' => {
            let length = parse_number(body)?;
            if length < 0 {
                return Ok(Reply::Bulk(None));
            }
            let length = usize::try_from(length).map_err(|_| AllocatorError::Protocol {
                reason: format!("Bulk length {length} out of range"),
            })?;
            let mut payload = vec![0u8; length + 2];
            reader
                .read_exact(&mut payload)
                .await
                .map_err(io_unavailable)?;
            if !payload.ends_with(b"\r\n") {
                return Err(AllocatorError::Protocol {
                    reason: "Bulk string missing terminator".to_string(),
                });
            }
            payload.truncate(length);
            Ok(Reply::Bulk(Some(payload)))
        }
        other => Err(AllocatorError::Protocol {
            reason: format!("Unsupported reply type {:?}", other as char),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(raw: &[u8]) -> Result<Reply, AllocatorError> {
        let mut reader = raw;
        read_reply(&mut reader).await
    }

    #[test]
    fn test_slot_key_format() {
        let id = SimulationId::generate();
        assert_eq!(slot_key(id), format!("simulation:{id}:slots"));
    }

    #[test]
    fn test_encode_command() {
        let encoded = encode_command(&["DECRBY", "simulation:x:slots", "1"]);
        assert_eq!(
            &encoded[..],
            b"*3\r\n$6\r\nDECRBY\r\n$18\r\nsimulation:x:slots\r\n$1\r\n1\r\n"
        );
    }

    #[tokio::test]
    async fn test_parse_simple_and_error_replies() {
        assert_eq!(parse(b"+OK\r\n").await.unwrap(), Reply::Simple("OK".into()));
        assert_eq!(
            parse(b"-ERR wrong type\r\n").await.unwrap(),
            Reply::Error("ERR wrong type".into())
        );
    }

    #[tokio::test]
    async fn test_parse_integer_replies() {
        assert_eq!(parse(b":42\r\n").await.unwrap(), Reply::Integer(42));
        assert_eq!(parse(b":-1\r\n").await.unwrap(), Reply::Integer(-1));
        assert!(matches!(
            parse(b":forty\r\n").await,
            Err(AllocatorError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_parse_bulk_replies() {
        assert_eq!(
            parse(b"$2\r\n17\r\n").await.unwrap(),
            Reply::Bulk(Some(b"17".to_vec()))
        );
        assert_eq!(parse(b"$-1\r\n").await.unwrap(), Reply::Bulk(None));
        assert!(matches!(
            parse(b"$2\r\n17xx").await,
            Err(AllocatorError::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn test_parse_rejects_malformed_frames() {
        assert!(matches!(
            parse(b"").await,
            Err(AllocatorError::Unavailable { .. })
        ));
        assert!(matches!(
            parse(b"+OK").await,
            Err(AllocatorError::Protocol { .. })
        ));
        assert!(matches!(
            parse(b"*1\r\n").await,
            Err(AllocatorError::Protocol { .. })
        ));
    }
}
