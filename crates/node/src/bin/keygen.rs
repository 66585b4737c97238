//! Generate or inspect Ed25519 signing keys for producer SDKs.

use clap::Parser;
use facto_types::KeyPair;

#[derive(Parser)]
#[command(name = "facto-keygen")]
#[command(about = "Generate Ed25519 signing keys for facto producers")]
#[command(version)]
struct Cli {
    /// Derive the keypair from an existing hex seed instead of generating
    /// a random one.
    #[arg(long)]
    seed: Option<String>,

    /// Print as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let keypair = match &cli.seed {
        Some(seed) => KeyPair::from_hex_seed(seed)?,
        None => KeyPair::generate(),
    };

    let seed_hex = keypair.seed_hex();
    let public_base64 = keypair.public_key().to_base64();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "seed": seed_hex,
                "public_key": public_base64,
            })
        );
    } else {
        println!("seed:       {seed_hex}");
        println!("public_key: {public_base64}");
    }
    Ok(())
}
