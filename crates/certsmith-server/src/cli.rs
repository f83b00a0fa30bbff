//! Command-line interface definitions.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Self-hosted certificate authority for development and lab use.
///
/// On first run a root CA is created and persisted under the output
/// directory; later runs reuse it. Identities given with `-D`/`-C` are
/// issued directly; `-S` additionally starts the HTTP issuance service.
#[derive(Parser, Debug)]
#[command(name = "certsmith", version, about)]
pub struct Cli {
    /// Directory holding the CA and issued artifacts
    #[arg(
        short = 'o',
        long = "output-dir",
        env = "CERTSMITH_DIR",
        default_value = "."
    )]
    pub output_dir: PathBuf,

    /// RSA key size in bits for the CA and all issued certificates
    #[arg(
        short = 'k',
        long = "key-size",
        default_value_t = 2048,
        value_parser = clap::value_parser!(u32).range(1024..=8192)
    )]
    pub key_size: u32,

    /// PKCS#12 KDF iteration count
    #[arg(long = "kdf-rounds", default_value_t = 50_000)]
    pub kdf_rounds: u32,

    /// PKCS#12 container password
    #[arg(short = 'P', long = "password", default_value = "password")]
    pub password: String,

    /// Issue a server certificate: canonical name followed by extra SANs
    /// (repeatable for multiple certificates)
    #[arg(short = 'D', long = "domain", num_args = 1.., action = ArgAction::Append, value_name = "NAME")]
    pub domains: Vec<Vec<String>>,

    /// Issue a client certificate for the given name (repeatable)
    #[arg(short = 'C', long = "client", action = ArgAction::Append, value_name = "NAME")]
    pub clients: Vec<String>,

    /// Regenerate identities even when artifacts already exist
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Run the HTTP issuance service after direct issuance
    #[arg(short = 'S', long = "serve")]
    pub serve: bool,

    /// Address to bind the issuance service to
    #[arg(short = 'b', long = "bind", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port for the issuance service
    #[arg(short = 'p', long = "port", default_value_t = 8080)]
    pub port: u16,
}

impl Cli {
    /// Returns the socket address the service binds to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
