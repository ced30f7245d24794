//! PQFE CLI - Post-quantum file encryption
//!
//! Usage:
//!   pqfe keygen               Generate and store a key pair
//!   pqfe keys                 Show stored key status
//!   pqfe delete-keys          Remove the stored key pair
//!   pqfe encrypt <file>       Encrypt with the stored (or a given) public key
//!   pqfe decrypt <file>       Decrypt with the stored private key
//!   pqfe inspect <file>       Print an artifact's header

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pqfe_core::{
    CipherId, DataRef, EncryptedArtifact, KemVariant, OutputMode, Pqfe, PqfeConfig, HEADER_LEN,
};
use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pqfe")]
#[command(author, version, about = "Post-quantum hybrid file encryption")]
#[command(
    long_about = "PQFE - Kyber key encapsulation with AES-256-GCM or ChaCha20-Poly1305.\n\n\
    Each file gets a fresh encapsulation; the output names its own KEM and cipher."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,
}

#[derive(clap::Args)]
struct Settings {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key directory (default ~/.pqfe/keys)
    #[arg(long, global = true)]
    key_dir: Option<PathBuf>,

    /// KEM variant: kyber512, kyber768, kyber1024
    #[arg(long, global = true)]
    kem: Option<KemVariant>,

    /// Cipher: aes-256-gcm, chacha20-poly1305
    #[arg(long, global = true)]
    cipher: Option<CipherId>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store a key pair
    Keygen {
        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
    },

    /// Show whether keys exist for the configured variant
    Keys,

    /// Remove the configured variant's key files
    DeleteKeys,

    /// Encrypt a file
    Encrypt {
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Encrypt to this raw public key file instead of the stored key
        #[arg(long)]
        recipient: Option<PathBuf>,
    },

    /// Decrypt a file
    Decrypt {
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print an artifact's header fields
    Inspect { file: PathBuf },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output directory (default: next to the input)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Output file name
    #[arg(long)]
    name: Option<String>,
}

impl From<OutputArgs> for OutputMode {
    fn from(args: OutputArgs) -> Self {
        OutputMode::ToFile {
            dir: args.out_dir,
            name: args.name,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(&cli.settings, cli.command)
}

fn run(settings: &Settings, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Keygen { force } => {
            let pqfe = open(load_config(settings)?)?;
            if !force && pqfe.load_keys()?.is_some() {
                bail!(
                    "{} keys already exist in {} (use --force to replace them)",
                    pqfe.config().kem_variant,
                    pqfe.config().key_directory.display()
                );
            }
            let pair = pqfe.generate_keys().context("Key generation failed")?;
            let keys = pqfe.key_manager();
            println!("Generated {} key pair", pair.variant());
            println!(
                "   public:  {} ({} bytes)",
                keys.public_key_path().display(),
                pair.public_key().len()
            );
            println!(
                "   private: {} ({} bytes)",
                keys.private_key_path().display(),
                pair.private_key().expose_secret().len()
            );
        }

        Commands::Keys => {
            let pqfe = open(load_config(settings)?)?;
            let variant = pqfe.config().kem_variant;
            match pqfe.load_keys()? {
                Some(_) => {
                    println!("{variant} (NIST level {}) keys present", variant.nist_level());
                    println!("   {}", pqfe.key_manager().public_key_path().display());
                    println!("   {}", pqfe.key_manager().private_key_path().display());
                }
                None => println!(
                    "No {variant} keys in {} (run `pqfe keygen`)",
                    pqfe.config().key_directory.display()
                ),
            }
        }

        Commands::DeleteKeys => {
            let pqfe = open(load_config(settings)?)?;
            if pqfe.delete_keys()? {
                println!("Deleted {} keys", pqfe.config().kem_variant);
            } else {
                println!("No {} keys to delete", pqfe.config().kem_variant);
            }
        }

        Commands::Encrypt {
            file,
            output,
            recipient,
        } => {
            let pqfe = open(load_config(settings)?)?;
            let public_key = match recipient {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("Failed to read public key {}", path.display()))?,
                None => pqfe.require_keys()?.public_key().to_vec(),
            };
            let encryptor = pqfe.encryptor(&public_key)?;
            let result = encryptor
                .encrypt_file(&file, &output.into())
                .with_context(|| format!("Failed to encrypt {}", file.display()))?;
            report("Encrypted", &file, &result);
        }

        Commands::Decrypt { file, output } => {
            let result = decrypt(settings, &file, output.into())?;
            report("Decrypted", &file, &result);
        }

        Commands::Inspect { file } => inspect(&file)?,
    }

    Ok(())
}

fn open(config: PqfeConfig) -> anyhow::Result<Pqfe> {
    Pqfe::new(config).context("Failed to open key directory")
}

/// Decrypt with the stored keys for whichever KEM level the artifact names
fn decrypt(settings: &Settings, file: &Path, output: OutputMode) -> anyhow::Result<DataRef> {
    let mut config = load_config(settings)?;
    if let Some(variant) = artifact_kem(file) {
        if variant != config.kem_variant {
            tracing::debug!(configured = %config.kem_variant, artifact = %variant, "using artifact KEM level");
        }
        config.kem_variant = variant;
    }

    let pqfe = open(config)?;
    let pair = pqfe.require_keys()?;
    pqfe.decrypt_file(
        &DataRef::File(file.to_path_buf()),
        pair.private_key().expose_secret(),
        &output,
    )
    .with_context(|| format!("Failed to decrypt {}", file.display()))
}

// Unreadable or unknown headers fall through; decrypt_file reports them
fn artifact_kem(file: &Path) -> Option<KemVariant> {
    let mut id = [0u8; 1];
    std::fs::File::open(file).ok()?.read_exact(&mut id).ok()?;
    KemVariant::from_id(id[0])
}

fn load_config(settings: &Settings) -> anyhow::Result<PqfeConfig> {
    let mut config = match &settings.config {
        Some(path) => PqfeConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PqfeConfig::default(),
    };
    if let Some(dir) = &settings.key_dir {
        config.key_directory = dir.clone();
    }
    if let Some(kem) = settings.kem {
        config.kem_variant = kem;
    }
    if let Some(cipher) = settings.cipher {
        config.cipher = cipher;
    }
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let artifact = EncryptedArtifact::from_bytes(&bytes)
        .with_context(|| format!("{} is not a PQFE artifact", file.display()))?;

    println!("{}", file.display());
    println!(
        "   KEM:            {} (id {:#04x}, NIST level {})",
        artifact.kem_variant,
        artifact.kem_variant.id(),
        artifact.kem_variant.nist_level()
    );
    println!("   Cipher:         {} (id {:#04x})", artifact.cipher, artifact.cipher.id());
    println!("   Header:         {HEADER_LEN} bytes");
    println!("   KEM ciphertext: {} bytes", artifact.kem_ciphertext.len());
    println!("   Nonce:          {} bytes", artifact.nonce.len());
    println!("   Tag:            {} bytes", artifact.tag.len());
    println!("   Body:           {} bytes", artifact.body.len());
    Ok(())
}

fn report(action: &str, input: &Path, result: &DataRef) {
    match result.as_path() {
        Some(path) => println!("{action} {} -> {}", input.display(), path.display()),
        None => println!("{action} {}", input.display()),
    }
}
