use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "boardbox")]
#[command(about = "Configuration-driven imageboard archiver", long_about = None)]
pub struct Cli {
    /// Path to the JSON settings document; `-` reads from standard input
    #[arg(long, default_value = "./asagi.json")]
    pub config: String,
}
