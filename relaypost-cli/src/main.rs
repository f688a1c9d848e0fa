use anyhow::Context;
use clap::{Parser, Subcommand};
use relaypost_core::{compress, AppKey, Request};
use relaypost_transport::{ClientConfig, ClientPoll, HostPoll, RelayClient};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "ws://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "relaypost", about = "One-shot poller for a relaypost server")]
struct Cli {
    /// Server URL.
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    /// Allow ws:// (for localhost development only).
    #[arg(long, global = true, default_value_t = false)]
    insecure_dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch (or issue) the host key for an application.
    Register {
        #[arg(long)]
        app: i64,
    },
    /// Host poll: publish, answer, list pending asks.
    Host {
        #[arg(long)]
        app: i64,
        #[arg(long, env = "RELAYPOST_KEY")]
        key: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        broadcast: Option<String>,
        /// Answer as IDX=TEXT. Repeatable.
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(i64, String)>,
        /// Ticket ids already handled. Repeatable.
        #[arg(long = "seen")]
        seen: Vec<i64>,
    },
    /// Client poll: ask, collect answers, read broadcasts.
    Client {
        #[arg(long)]
        app: i64,
        #[arg(long)]
        path: String,
        #[arg(long)]
        ask: Option<String>,
        /// Ticket to collect. Repeatable.
        #[arg(long = "ticket")]
        tickets: Vec<i64>,
        /// Broadcast serials already read. Repeatable.
        #[arg(long = "seen")]
        seen: Vec<i64>,
    },
    /// Send a raw JSON request and print the raw reply.
    Raw { json: String },
}

fn parse_answer(raw: &str) -> Result<(i64, String), String> {
    let (idx, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected IDX=TEXT, got `{raw}`"))?;
    let idx = idx
        .trim()
        .parse()
        .map_err(|e| format!("bad ticket id `{idx}`: {e}"))?;
    Ok((idx, text.to_string()))
}

async fn run(cli: Cli) -> anyhow::Result<Value> {
    let mut config = ClientConfig::new(cli.server);
    if cli.insecure_dev {
        config = config.with_insecure_dev();
    }
    let mut client = RelayClient::connect(config).await?;

    let output = match cli.command {
        Command::Register { app } => {
            let key = client.register_host(app).await?;
            json!({"app_id": app, "key": key.as_str()})
        }
        Command::Host {
            app,
            key,
            path,
            broadcast,
            answers,
            seen,
        } => {
            let key = AppKey::from_string(key);
            let mut poll = HostPoll::new().watch(&path, compress(seen));
            if let Some(text) = broadcast {
                poll = poll.broadcast(&path, text);
            }
            for (idx, text) in answers {
                poll = poll.answer(&path, idx, text);
            }
            let pending = client.host_poll(app, &key, poll).await?;
            json!({ "pending": pending })
        }
        Command::Client {
            app,
            path,
            ask,
            tickets,
            seen,
        } => {
            let mut poll = ClientPoll::new(path).seen(compress(seen));
            if let Some(text) = ask {
                poll = poll.ask(text);
            }
            if !tickets.is_empty() {
                poll = poll.collect(tickets);
            }
            let reply = client.client_poll(app, poll).await?;
            json!({
                "ticket": reply.ticket,
                "answered": reply.answered,
                "answers": reply.answers,
                "broadcasts": reply.broadcasts,
            })
        }
        Command::Raw { json } => {
            let request = Request::decode(&json)?;
            let reply = client.request(&request).await?;
            serde_json::to_value(reply).context("reply not serializable")?
        }
    };

    client.close().await;
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let output = run(Cli::parse()).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("7=hello").unwrap(), (7, "hello".to_string()));
        assert_eq!(parse_answer("7=a=b").unwrap(), (7, "a=b".to_string()));
        assert!(parse_answer("hello").is_err());
        assert!(parse_answer("x=hello").is_err());
    }

    #[test]
    fn test_cli_parses_client_poll() {
        let cli = Cli::try_parse_from([
            "relaypost", "--insecure-dev", "client", "--app", "3", "--path", "p",
            "--ticket", "1", "--ticket", "2", "--seen", "5",
        ])
        .unwrap();
        assert!(cli.insecure_dev);
        match cli.command {
            Command::Client { app, tickets, seen, .. } => {
                assert_eq!(app, 3);
                assert_eq!(tickets, vec![1, 2]);
                assert_eq!(seen, vec![5]);
            }
            _ => panic!("expected client command"),
        }
    }
}
