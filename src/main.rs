use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::process;

use clap::{ArgAction, Parser};
use log::{LevelFilter, error, info, warn};

use udpspoof::{Config, SpoofedConn, TotalLenOrder, logger};

/// Send a UDP datagram with a spoofed source address and port.
///
/// Requires the privilege to open raw sockets (root or `CAP_NET_RAW`).
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Destination endpoint, as `host:port`
    dest: String,

    /// Payload to send; read from stdin when omitted
    data: Option<String>,

    /// Spoofed source address
    #[arg(long, default_value_t = *Config::DEFAULT_SRC.ip())]
    src_ip: Ipv4Addr,

    /// Spoofed source port
    #[arg(long, default_value_t = Config::DEFAULT_SRC.port())]
    src_port: u16,

    /// Swap the bytes of the IPv4 total-length field (Darwin-style raw sockets)
    #[arg(long, conflicts_with = "network_len_field")]
    swap_len_field: bool,

    /// Send the IPv4 total-length field in network byte order
    #[arg(long)]
    network_len_field: bool,

    /// Number of datagrams to send
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Config {
        let order = if self.swap_len_field {
            TotalLenOrder::Swapped
        } else if self.network_len_field {
            TotalLenOrder::Network
        } else {
            TotalLenOrder::native()
        };

        Config::default()
            .with_src(SocketAddrV4::new(self.src_ip, self.src_port))
            .with_total_len_order(order)
    }

    fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn payload(&self) -> io::Result<Vec<u8>> {
        match self.data {
            Some(ref data) => Ok(data.as_bytes().to_vec()),
            None => {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logger::init(cli.level()) {
        eprintln!("failed to initialize logger: {err}");
    }

    let payload = cli.payload().unwrap_or_else(|err| {
        error!("failed to read payload from stdin: {err}");
        process::exit(1);
    });

    let conn = SpoofedConn::connect(&cli.dest, cli.config()).unwrap_or_else(|err| {
        error!("failed to open connection to {}: {err}", cli.dest);
        process::exit(1);
    });

    info!(
        "sending {} datagram(s): {} -> {} ({:?} total length)",
        cli.count,
        conn.src(),
        conn.dst(),
        conn.total_len_order()
    );

    for _ in 0..cli.count {
        match conn.write(&payload) {
            Ok(sent) => {
                if sent.is_truncated() {
                    warn!("message is too large, truncated {} bytes", sent.truncated);
                }
                info!("sent {} bytes to {}", sent.len, conn.dst());
            }
            Err(err) => {
                error!("{err}");
                process::exit(1);
            }
        }
    }

    if let Err(err) = conn.close() {
        error!("{err}");
        process::exit(1);
    }
}
