//! Netizmo CLI
//!
//! Thin wrapper around netizmo-core for viewing and editing your profile.
//!
//! ## Usage
//!
//! ```bash
//! # Bind an account (the private store is unreachable until you do)
//! netizmo login kyle
//!
//! # Show your profile
//! netizmo show
//!
//! # Create or replace your profile
//! netizmo edit --first-name Kyle --last-name Yoon --need "A designer" \
//!     --skill swift --skill cloudkit --image avatar.png
//!
//! # Show which account is bound
//! netizmo status
//!
//! # Unbind the account
//! netizmo logout
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use netizmo_core::{
    AccountId, IdentityTokenGate, LocalProfileStore, NoProfileReason, Profile, ProfileConfig,
    ProfileImage, ProfilePresenter, ProfileSyncController, ProfileView, Storage, StoreError,
    SyncState,
};

/// Netizmo - your profile, stored privately per account
#[derive(Parser)]
#[command(name = "netizmo")]
#[command(version = "0.1.0")]
#[command(about = "Netizmo - view and edit your profile")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.netizmo/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind an account to this device
    Login {
        /// Account name
        account: String,
    },

    /// Unbind the current account
    Logout,

    /// Show which account is bound
    Status,

    /// Show your profile
    Show,

    /// Create or replace your profile
    ///
    /// When a profile exists, omitted fields keep their current values.
    Edit {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// What you need
        #[arg(long)]
        need: Option<String>,

        /// A skill (repeat for several, order is kept)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// Remove all skills
        #[arg(long, conflicts_with = "skills")]
        clear_skills: bool,

        /// Profile image file (PNG, JPEG or WebP)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Remove the profile image
        #[arg(long, conflicts_with = "image")]
        clear_image: bool,
    },
}

/// Field values supplied to `edit`
struct EditArgs {
    first_name: Option<String>,
    last_name: Option<String>,
    need: Option<String>,
    skills: Vec<String>,
    clear_skills: bool,
    image: Option<ProfileImage>,
    clear_image: bool,
}

impl EditArgs {
    /// Apply to the pre-filled profile, or build a new one.
    fn into_profile(self, existing: Option<Profile>) -> Result<Profile> {
        let mut profile = match existing {
            Some(profile) => profile,
            None => {
                let (Some(first), Some(last), Some(need)) =
                    (&self.first_name, &self.last_name, &self.need)
                else {
                    anyhow::bail!(
                        "No profile yet: --first-name, --last-name and --need are required"
                    );
                };
                Profile::new(first.clone(), last.clone(), need.clone())
            }
        };

        if let Some(first) = self.first_name {
            profile.first_name = first;
        }
        if let Some(last) = self.last_name {
            profile.last_name = last;
        }
        if let Some(need) = self.need {
            profile.need = need;
        }
        if self.clear_skills {
            profile.skills = None;
        } else if !self.skills.is_empty() {
            profile.skills = Some(self.skills);
        }
        if self.clear_image {
            profile.profile_image = None;
        } else if let Some(image) = self.image {
            profile.profile_image = Some(image);
        }
        Ok(profile)
    }
}

/// Prints controller events to the terminal
#[derive(Default)]
struct TerminalPresenter {
    /// Creation hint is only useful for `show`
    show_create_hint: bool,
    /// Profile handed to the edit flow, if any
    edit_prefill: Option<Profile>,
    last_error: Option<String>,
}

impl ProfilePresenter for TerminalPresenter {
    fn on_profile_ready(&mut self, profile: &Profile) {
        print_profile(&ProfileView::from(profile), profile);
    }

    fn on_no_profile(&mut self, reason: NoProfileReason) {
        match reason {
            NoProfileReason::Absent => println!("No profile yet."),
            NoProfileReason::Unreadable => {
                println!("Your stored profile could not be read.")
            }
        }
    }

    fn on_auth_required(&mut self) {
        eprintln!("Not logged in: you must be logged into an account to use Netizmo.");
        eprintln!("Run `netizmo login <account>` and try again.");
    }

    fn on_store_error(&mut self, error: &StoreError) {
        eprintln!("Could not reach your profile store: {}", error);
        eprintln!("Nothing was changed. Try again.");
        self.last_error = Some(error.to_string());
    }

    fn on_edit_requested(&mut self, existing: Option<&Profile>) {
        self.edit_prefill = existing.cloned();
        if self.show_create_hint && existing.is_none() {
            println!(
                "Create one with: netizmo edit --first-name <FIRST> --last-name <LAST> --need <NEED>"
            );
        }
    }
}

type Controller = ProfileSyncController<IdentityTokenGate, LocalProfileStore, TerminalPresenter>;

fn print_profile(view: &ProfileView, profile: &Profile) {
    println!("Your Profile:");
    println!("  Name: {}", view.display_name);
    println!("  Need: {}", if view.need.is_empty() { "(empty)" } else { &view.need });
    match &profile.profile_image {
        Some(image) => println!("  Image: {} ({} bytes)", image.mime_type(), image.data().len()),
        None => println!("  Image: (none)"),
    }
    println!("  Skills ({}):", view.item_count());
    for skill in &view.skill_items {
        println!("    - {}", skill);
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.netizmo/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".netizmo")
        .join("data")
}

fn read_image(path: &Path, config: &ProfileConfig) -> Result<ProfileImage> {
    let data = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read image file {}: {}", path.display(), e))?;
    ProfileImage::from_bytes(data, config.max_image_bytes)
        .map_err(|e| anyhow::anyhow!("Invalid image {}: {}", path.display(), e))
}

/// Turn a terminal controller state into the command's exit status
fn finish(controller: &Controller) -> Result<()> {
    match controller.state() {
        SyncState::Unauthenticated => anyhow::bail!("Not logged in"),
        SyncState::StoreFailed(message) => anyhow::bail!("Profile store failed: {}", message),
        _ => match &controller.presenter().last_error {
            Some(message) => anyhow::bail!("Profile store failed: {}", message),
            None => Ok(()),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config = ProfileConfig::load(&data_dir)?;
    let storage = Storage::new(config.database_path(&data_dir))?;
    tracing::debug!(?data_dir, "Opened storage");

    match cli.command {
        Commands::Login { account } => {
            let account = AccountId::new(&account)
                .ok_or_else(|| anyhow::anyhow!("Invalid account name '{}'", account))?;
            storage.bind_account(&account)?;
            println!("Logged in as {}", account);
        }

        Commands::Logout => {
            storage.unbind_account()?;
            println!("Logged out");
        }

        Commands::Status => match storage.bound_account()? {
            Some(account) => println!("Logged in as {}", account),
            None => println!("Not logged in"),
        },

        Commands::Show => {
            let mut controller = new_controller(&storage);
            controller.presenter_mut().show_create_hint = true;
            controller.start()?;
            controller.settle().await;
            finish(&controller)?;
        }

        Commands::Edit {
            first_name,
            last_name,
            need,
            skills,
            clear_skills,
            image,
            clear_image,
        } => {
            let image = image
                .as_deref()
                .map(|path| read_image(path, &config))
                .transpose()?;
            let args = EditArgs {
                first_name,
                last_name,
                need,
                skills,
                clear_skills,
                image,
                clear_image,
            };

            let mut controller = new_controller(&storage);
            controller.start()?;
            controller.settle().await;

            match controller.state() {
                SyncState::ProfileLoaded => controller.begin_edit()?,
                SyncState::Editing => {}
                _ => return finish(&controller),
            }

            let prefill = controller.presenter_mut().edit_prefill.take();
            let profile = args.into_profile(prefill)?;
            controller.on_saved(profile)?;
            controller.settle().await;
            finish(&controller)?;
        }
    }

    Ok(())
}

fn new_controller(storage: &Storage) -> Controller {
    ProfileSyncController::new(
        IdentityTokenGate::new(storage.clone()),
        Arc::new(LocalProfileStore::new(storage.clone())),
        TerminalPresenter::default(),
    )
}
