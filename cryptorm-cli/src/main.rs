//! `cryptorm` CLI tool for key management and offline codec inspection.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cryptorm::{Codec, EncryptionKey, FieldKind, Hashed, SqlValue, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cryptorm")]
#[command(about = "cryptorm key management and codec CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new base64 encryption key
    Keygen,
    /// Print the search digest of a value, for manual SQL lookups
    Digest {
        #[command(flatten)]
        field: FieldArgs,
        /// Plaintext to hash
        value: String,
    },
    /// Print the ciphertext of a protected value as hex
    Seal {
        #[command(flatten)]
        field: FieldArgs,
        /// Value type
        #[arg(long, value_enum, default_value_t = Kind::Text)]
        kind: Kind,
        /// Plaintext to encrypt
        value: String,
    },
    /// Decrypt a hex ciphertext read from storage
    Open {
        #[command(flatten)]
        field: FieldArgs,
        /// Value type
        #[arg(long, value_enum, default_value_t = Kind::Text)]
        kind: Kind,
        /// Ciphertext as hex
        ciphertext: String,
    },
}

#[derive(Args)]
struct FieldArgs {
    /// Base64 encryption key
    #[arg(long, env = "CRYPTORM_KEY", hide_env_values = true, value_parser = parse_key)]
    key: EncryptionKey,
    /// Table the field belongs to
    #[arg(long)]
    table: String,
    /// Column name
    #[arg(long)]
    column: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Bool,
    Int,
    Text,
}

impl Kind {
    const fn field_kind(self) -> FieldKind {
        match self {
            Self::Bool => FieldKind::Boolean,
            Self::Int => FieldKind::Integer,
            Self::Text => FieldKind::Text,
        }
    }

    fn parse(self, raw: &str) -> Result<Value> {
        Ok(match self {
            Self::Bool => Value::Bool(raw.parse().context("expected `true` or `false`")?),
            Self::Int => Value::Int(raw.parse().context("expected an integer")?),
            Self::Text => Value::Text(raw.to_string()),
        })
    }
}

fn parse_key(encoded: &str) -> Result<EncryptionKey, cryptorm::Error> {
    EncryptionKey::from_base64(encoded.trim())
}

impl FieldArgs {
    fn protect(&self, kind: FieldKind, value: &Value) -> Result<Vec<u8>> {
        let codec = Codec::new(&self.key)?;
        match codec.protect_column(&self.table, &self.column, kind, value)? {
            SqlValue::Blob(bytes) => Ok(bytes),
            other => bail!("unexpected stored form: {}", other.type_name()),
        }
    }

    fn unprotect(&self, kind: FieldKind, blob: Vec<u8>) -> Result<Value> {
        let codec = Codec::new(&self.key)?;
        Ok(codec.unprotect_column(&self.table, &self.column, kind, &SqlValue::Blob(blob))?)
    }
}

fn run(command: Commands) -> Result<String> {
    match command {
        Commands::Keygen => Ok(EncryptionKey::generate().to_base64()),
        Commands::Digest { field, value } => {
            let digest = field.protect(FieldKind::Hashable, &Value::Hashed(Hashed::from(value)))?;
            Ok(hex::encode(digest))
        }
        Commands::Seal { field, kind, value } => {
            let ciphertext = field.protect(kind.field_kind(), &kind.parse(&value)?)?;
            Ok(hex::encode(ciphertext))
        }
        Commands::Open { field, kind, ciphertext } => {
            let blob = hex::decode(ciphertext.trim()).context("ciphertext is not valid hex")?;
            debug!(bytes = blob.len(), "decrypting");
            match field.unprotect(kind.field_kind(), blob)? {
                Value::Bool(b) => Ok(b.to_string()),
                Value::Int(n) => Ok(n.to_string()),
                Value::Text(s) => Ok(s),
                other => bail!("unexpected plaintext kind: {}", other.type_name()),
            }
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    println!("{}", run(cli.command)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(key: &EncryptionKey) -> FieldArgs {
        FieldArgs { key: key.clone(), table: "users".into(), column: "name".into() }
    }

    fn seal(key: &EncryptionKey, kind: Kind, value: &str) -> String {
        run(Commands::Seal { field: field(key), kind, value: value.into() }).unwrap()
    }

    #[test]
    fn test_seal_then_open() {
        let key = EncryptionKey::generate();
        let sealed = seal(&key, Kind::Int, "42");

        let open = Commands::Open { field: field(&key), kind: Kind::Int, ciphertext: sealed };
        let opened = run(open);
        assert_eq!(opened.unwrap(), "42");
    }

    #[test]
    fn test_digest_is_stable() {
        let key = EncryptionKey::generate();
        let a = run(Commands::Digest { field: field(&key), value: "x".into() }).unwrap();
        let b = run(Commands::Digest { field: field(&key), value: "x".into() }).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_open_with_wrong_kind_fails() {
        let key = EncryptionKey::generate();
        let sealed = seal(&key, Kind::Text, "hi");

        let open = Commands::Open { field: field(&key), kind: Kind::Bool, ciphertext: sealed };
        assert!(run(open).is_err());
    }

    #[test]
    fn test_keygen_output_parses_as_key() {
        let encoded = run(Commands::Keygen).unwrap();
        assert!(parse_key(&encoded).is_ok());
        assert!(parse_key("not base64!").is_err());
    }

    #[test]
    fn test_key_parsed_from_argument() {
        let encoded = EncryptionKey::generate().to_base64();
        let args = |key: &str| {
            let argv = ["cryptorm", "digest", "--key", key, "--table", "t", "--column", "c", "a"];
            Cli::try_parse_from(argv.map(str::to_string))
        };

        assert!(args(&encoded).is_ok());
        assert!(args("short").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
