//! In-process server speaking enough of the Redis protocol for slot counters.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct FakeState {
    values: Mutex<HashMap<String, i64>>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl FakeState {
    fn apply(&self, args: &[String]) -> String {
        self.commands.lock().push(args.to_vec());

        let Some(command) = args.first() else {
            return "-ERR empty command\r\n".to_string();
        };
        let mut values = self.values.lock();

        match command.to_uppercase().as_str() {
            "PING" => "+PONG\r\n".to_string(),
            "SET" if args.len() >= 3 => {
                let Ok(value) = args[2].parse::<i64>() else {
                    return "-ERR value is not an integer\r\n".to_string();
                };
                let nx = args[3..].iter().any(|arg| arg.eq_ignore_ascii_case("NX"));
                if nx && values.contains_key(&args[1]) {
                    return "$-1\r\n".to_string();
                }
                values.insert(args[1].clone(), value);
                "+OK\r\n".to_string()
            }
            "DECRBY" | "INCRBY" if args.len() == 3 => {
                let Ok(amount) = args[2].parse::<i64>() else {
                    return "-ERR value is not an integer\r\n".to_string();
                };
                let counter = values.entry(args[1].clone()).or_insert(0);
                if command.eq_ignore_ascii_case("DECRBY") {
                    *counter -= amount;
                } else {
                    *counter += amount;
                }
                format!(":{counter}\r\n")
            }
            "GET" if args.len() == 2 => match values.get(&args[1]) {
                Some(value) => {
                    let text = value.to_string();
                    format!("${}\r\n{text}\r\n", text.len())
                }
                None => "$-1\r\n".to_string(),
            },
            "DEL" if args.len() >= 2 => {
                let removed = args[1..]
                    .iter()
                    .filter(|key| values.remove(*key).is_some())
                    .count();
                format!(":{removed}\r\n")
            }
            _ => format!("-ERR unknown command '{command}'\r\n"),
        }
    }
}

/// Handle to a running fake server.
pub struct FakeRespServer {
    pub address: String,
    state: Arc<FakeState>,
}

impl FakeRespServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let state = Arc::new(FakeState::default());

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, accept_state.clone()));
            }
        });

        Self { address, state }
    }

    pub fn value(&self, key: &str) -> Option<i64> {
        self.state.values.lock().get(key).copied()
    }

    pub fn key_count(&self) -> usize {
        self.state.values.lock().len()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.commands.lock().clone()
    }
}

async fn serve(socket: TcpStream, state: Arc<FakeState>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    while let Some(args) = read_command(&mut reader).await {
        let reply = state.apply(&args);
        if write.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn read_command<R>(reader: &mut R) -> Option<Vec<String>>
where
    R: AsyncBufReadExt + AsyncReadExt + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await.ok()?;
        let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;

        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).await.ok()?;
        data.truncate(len);
        args.push(String::from_utf8(data).ok()?);
    }
    Some(args)
}
