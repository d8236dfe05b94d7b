use clap::Parser;
use shared::{Command, ServerMessage, DEFAULT_PORT};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Line-oriented client for poking at a running server.
/// Every stdin line is sent as a raw frame, e.g. `SETWORD:alice:cat`.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Player name sent in the initial CONNECT
    #[clap(short, long)]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let server_addr = format!("{}:{}", args.host, args.port);
    let stream = TcpStream::connect(&server_addr).await?;
    println!("Connected to {}", server_addr);

    let (read_half, mut write_half) = stream.into_split();

    // Print everything the server sends
    let printer = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match ServerMessage::parse(&line) {
                Ok(ServerMessage::Game(view)) => println!(
                    "word: {}  attempts: {}  turn: {}  tried: {:?}",
                    view.masked_word, view.attempts_left, view.current_guesser, view.guessed_letters
                ),
                Ok(ServerMessage::Users(players)) => {
                    for player in players {
                        println!(
                            "  {} {} score={} {}",
                            player.name,
                            player.color,
                            player.score,
                            player.status()
                        );
                    }
                }
                Ok(message) => println!("{:?}", message),
                Err(e) => println!("Unparseable frame {:?}: {}", line, e),
            }
        }
        println!("Server closed the connection");
    });

    let connect = Command::Connect {
        name: args.name.clone(),
    };
    write_half.write_all(connect.to_frame().as_bytes()).await?;

    let mut stdin = BufReader::new(io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        write_half.write_all(format!("{}\n", line.trim()).as_bytes()).await?;
    }

    let disconnect = Command::Disconnect { name: args.name };
    write_half.write_all(disconnect.to_frame().as_bytes()).await?;
    write_half.shutdown().await?;
    printer.await?;

    println!("Test client finished");
    Ok(())
}
