use std::net::SocketAddr;

mod cli;

#[tokio::main]
async fn main() {
    match cli::run() {
        cli::RunOutcome::Serve(config, port) => {
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            println!("listening on http://{addr}");
            inkpad::serve(addr, config).await;
        }
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    }
}
