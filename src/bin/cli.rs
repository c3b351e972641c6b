use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use dotenvy::dotenv;
use validator::Validate;

use slate::authz::PermissionMatrix;
use slate_auth::create_access_token;
use slate_config::JwtConfig;
use slate_db::{PgStore, SchoolStore, init_db_pool, run_migrations};
use slate_models::{NewPrincipal, PermissionRule, Role};

#[derive(Parser)]
#[command(name = "slate-cli")]
#[command(about = "Slate CLI - Administrative tools for Slate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Write the default permission matrix to the permission_rules table
    SeedPermissions {
        /// Replace rules that are already stored
        #[arg(long)]
        force: bool,
    },
    /// Create a principal (prompts for missing fields)
    CreatePrincipal {
        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Display name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Role, e.g. super_admin, admin, staff
        #[arg(short = 'r', long)]
        role: Option<Role>,
    },
    /// Issue an access token for an existing principal
    IssueToken {
        /// Email address of the principal
        #[arg(short = 'e', long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Migrate => {
            run_migrations(&pool).await.context("Migration failed")?;
            println!("✅ Migrations applied");
        }
        Commands::SeedPermissions { force } => handle_seed_permissions(&PgStore::new(pool), force).await?,
        Commands::CreatePrincipal { email, name, role } => {
            handle_create_principal(&PgStore::new(pool), email, name, role).await?
        }
        Commands::IssueToken { email } => handle_issue_token(&PgStore::new(pool), &email).await?,
    }

    Ok(())
}

async fn handle_seed_permissions(store: &PgStore, force: bool) -> anyhow::Result<()> {
    let existing = store
        .load_permission_rules()
        .await
        .map_err(|e| anyhow!("{e}"))?;
    if !existing.is_empty() && !force {
        println!(
            "⚠️  {} rules already stored, pass --force to replace them",
            existing.len()
        );
        return Ok(());
    }

    let matrix = PermissionMatrix::school_defaults();
    let rules: Vec<PermissionRule> = matrix.rules().into_iter().cloned().collect();
    store
        .replace_permission_rules(&rules)
        .await
        .map_err(|e| anyhow!("{e}"))?;

    println!("✅ Stored {} permission rules", rules.len());
    for rule in &rules {
        let roles: Vec<_> = rule.allowed_roles.iter().map(|r| r.as_str()).collect();
        println!(
            "   {:<13} {:<7} {}{}",
            rule.resource_type.as_str(),
            rule.action.as_str(),
            roles.join(", "),
            if rule.requires_ownership { " (owner)" } else { "" }
        );
    }
    Ok(())
}

async fn handle_create_principal(
    store: &PgStore,
    email: Option<String>,
    name: Option<String>,
    role: Option<Role>,
) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email address").interact_text()?,
    };

    let display_name = match name {
        Some(name) => name,
        None => Input::new().with_prompt("Display name").interact_text()?,
    };

    let role = match role {
        Some(role) => role,
        None => {
            let labels: Vec<_> = Role::ALL.iter().map(|r| r.as_str()).collect();
            let index = Select::new()
                .with_prompt("Role")
                .items(&labels)
                .default(0)
                .interact()?;
            Role::ALL[index]
        }
    };

    let new = NewPrincipal {
        email,
        display_name,
        role,
        profile_id: None,
    };
    new.validate().context("Invalid principal")?;

    let principal = new.into_principal();
    store
        .insert_principal(&principal)
        .await
        .map_err(|e| anyhow!("Error creating principal: {e}"))?;

    println!("\n✅ Principal created successfully!");
    println!("   ID: {}", principal.id);
    println!("   Email: {}", principal.email);
    println!("   Role: {}", principal.role);
    Ok(())
}

async fn handle_issue_token(store: &PgStore, email: &str) -> anyhow::Result<()> {
    let principal = store
        .find_principal_by_email(email)
        .await
        .map_err(|e| anyhow!("{e}"))?
        .ok_or_else(|| anyhow!("No principal with email {email}"))?;

    let jwt_config = JwtConfig::from_env();
    let token = create_access_token(&principal, &jwt_config).map_err(|e| anyhow!("{e}"))?;

    println!("{token}");
    Ok(())
}
