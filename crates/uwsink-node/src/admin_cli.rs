//! sink-admin CLI tool
//!
//! Drives a running sink-node over its admin socket.
//!
//! Usage:
//!   sink-admin start
//!   sink-admin stop
//!   sink-admin stats
//!   sink-admin reset-stats
//!   sink-admin set-trace <suffix> [precision]
//!   sink-admin list-invalid
//!   sink-admin send-packet [low|high]
//!   sink-admin set-priority <low|high>
//!   sink-admin ping

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use uwsink_node::admin_socket::{AdminCommand, AdminResponse};
use uwsink_node::Priority;

fn print_usage() {
    eprintln!("sink-admin - Control a running uwsink sink node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  sink-admin start                        Start periodic traffic");
    eprintln!("  sink-admin stop                         Stop periodic traffic");
    eprintln!("  sink-admin stats                        Print statistics");
    eprintln!("  sink-admin reset-stats                  Zero reception statistics");
    eprintln!("  sink-admin set-trace <suffix> [digits]  Trace into tracefile<suffix>.txt");
    eprintln!("  sink-admin list-invalid                 List dropped invalid packets");
    eprintln!("  sink-admin send-packet [low|high]       Send one packet now");
    eprintln!("  sink-admin set-priority <low|high>      Change default priority");
    eprintln!("  sink-admin ping                         Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  UWSINK_ADMIN_SOCKET  Path to admin socket (default: ./uwsink-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("UWSINK_ADMIN_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./uwsink-data/admin.sock"))
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to sink-node at {:?}: {}\n\
             Is the sink-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn parse_priority(arg: &str) -> Priority {
    match arg.parse() {
        Ok(priority) => priority,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "start" => AdminCommand::Start,
        "stop" => AdminCommand::Stop,
        "stats" => AdminCommand::Stats,
        "reset-stats" => AdminCommand::ResetStats,
        "set-trace" => {
            if args.len() < 3 {
                eprintln!("Error: set-trace requires a suffix argument");
                std::process::exit(1);
            }
            let precision = match args.get(3).map(|p| p.parse::<usize>()) {
                None => None,
                Some(Ok(p)) => Some(p),
                Some(Err(e)) => {
                    eprintln!("Error: invalid precision: {}", e);
                    std::process::exit(1);
                }
            };
            AdminCommand::SetTrace {
                suffix: args[2].clone(),
                precision,
            }
        }
        "list-invalid" => AdminCommand::ListInvalid,
        "send-packet" => AdminCommand::SendPacket {
            priority: args.get(2).map(|p| parse_priority(p)),
        },
        "set-priority" => {
            if args.len() < 3 {
                eprintln!("Error: set-priority requires low or high");
                std::process::exit(1);
            }
            AdminCommand::SetPriority {
                priority: parse_priority(&args[2]),
            }
        }
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::Stats { stats } => {
                println!("sink {} ({:?})", stats.sink_id, stats.order_policy);
                println!("  rtt          {:.6} s (std {:.6})", stats.rtt, stats.rtt_std);
                println!("  ftt          {:.6} s (std {:.6})", stats.ftt, stats.ftt_std);
                println!("  per          {:.6}", stats.per);
                println!("  throughput   {:.3} bps", stats.throughput);
                println!("  sent         {}", stats.sent);
                println!("  received     {}", stats.received);
                println!("  out of order {}", stats.out_of_order);
                println!("  lost         {}", stats.lost);
                println!("  invalid      {}", stats.invalid);
                println!("  highest seq  {}", stats.highest_seq);
                println!("  handoffs     {}", stats.cross_cluster_handoffs);
                println!("  auth served  {}", stats.auth_requests_served);
                println!("  store fails  {}", stats.store_failures);
            }
            AdminResponse::Invalid { packets } => {
                if packets.is_empty() {
                    println!("(none)");
                } else {
                    for p in packets {
                        println!("{} src={} seq={} at={} {}", p.uid, p.src, p.seq, p.at, p.reason);
                    }
                }
            }
            AdminResponse::Pong => {
                println!("pong - sink-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
