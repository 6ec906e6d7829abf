//! `pedidos`: terminal front end for the pedidos order API.
//!
//! Each subcommand that shows a view asks the route table first, exactly as a
//! browser navigation would, then talks to the API through the client library.
//! The session lives in the file named by `PEDIDOS_SESSION_FILE`.


mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pedidos_client::config::{ConfigError, normalize_api_url};
use pedidos_client::forms::{self, FormError};
use pedidos_client::net::orders::{InvalidDate, PedidoFilters, needs_transition, parse_filter_date};
use pedidos_client::net::types::{PedidoEstado, Prioridad, UserUpdate};
use pedidos_client::net::users::{UserCounts, can_toggle_active, filter_users};
use pedidos_client::router::{DASHBOARD_PATH, ESTADISTICAS_PATH, LOGIN_PATH, PEDIDOS_PATH, PROFILE_PATH, USERS_PATH};
use pedidos_client::state::storage::FileStorage;
use pedidos_client::{ApiClient, ApiError, AuthGateway, ClientConfig, Decision, Identity, Role, RouteTable, Session, SessionStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Date(#[from] InvalidDate),
    #[error("{path} redirected to {target}")]
    Redirected { path: String, target: String },
    #[error("you cannot change the active status of your own account")]
    OwnAccount,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Redirected { target, .. } if target == LOGIN_PATH => Some("run `pedidos login` first"),
            Self::Redirected { .. } => Some("your role cannot open this view"),
            Self::Api(e) if e.requires_reauth() => Some("run `pedidos login` again"),
            _ => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pedidos", about = "Terminal client for the pedidos order API")]
struct Cli {
    #[arg(long, env = "PEDIDOS_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "PEDIDOS_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PEDIDOS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log into it.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// Landing view with the views your role may open.
    Dashboard,
    /// Decide a navigation to PATH against the stored session.
    Route { path: String },
    Profile(ProfileCommand),
    Pedidos(PedidosCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    /// Re-fetch the profile from the server.
    Refresh,
    /// Change name or email; omitted fields keep their current value.
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Args, Debug)]
struct PedidosCommand {
    #[command(subcommand)]
    command: PedidosSubcommand,
}

#[derive(Subcommand, Debug)]
enum PedidosSubcommand {
    List(PedidoListArgs),
    /// Move an order to another state; the customer is notified on Telegram.
    Estado {
        id: i64,
        estado: PedidoEstado,
        /// Current state; the call is skipped when it already matches.
        #[arg(long)]
        from: Option<PedidoEstado>,
    },
    Stats,
}

#[derive(Args, Debug)]
struct PedidoListArgs {
    #[arg(long)]
    estado: Option<PedidoEstado>,
    #[arg(long)]
    prioridad: Option<Prioridad>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    desde: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    hasta: Option<String>,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long, default_value_t = 0)]
    offset: u32,
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List {
        /// Substring of email or name.
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        role: Option<Role>,
    },
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        active: Option<bool>,
    },
    Activate {
        id: String,
    },
    Deactivate {
        id: String,
    },
    /// Set a new password for a user.
    Password {
        id: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, "ignoring unreadable .env file");
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = normalize_api_url(&url)?;
    }
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }
    let shell = Shell::open(&config, cli.json)?;

    match cli.command {
        Command::Login { email, password } => shell.login(&email, &password).await,
        Command::Register { email, password, confirm_password, name } => {
            shell.register(&email, &password, &confirm_password, &name).await
        }
        Command::Logout => {
            shell.gateway.logout();
            shell.say("logged out")
        }
        Command::Whoami => shell.whoami(),
        Command::Dashboard => shell.dashboard(),
        Command::Route { path } => shell.route(&path),
        Command::Profile(profile) => shell.profile(profile.command).await,
        Command::Pedidos(pedidos) => shell.pedidos(pedidos.command).await,
        Command::Users(users) => shell.users(users.command).await,
    }
}

// =============================================================================
// SHELL
// =============================================================================

struct Shell {
    gateway: AuthGateway<ApiClient>,
    routes: RouteTable,
    page_limit: u32,
    json: bool,
}

impl Shell {
    fn open(config: &ClientConfig, json: bool) -> Result<Self, CliError> {
        let api = ApiClient::new(config)?;
        let session = SessionStore::new(Arc::new(FileStorage::new(&config.session_file)));
        session.restore();
        Ok(Self { gateway: AuthGateway::new(api, session), routes: RouteTable::default(), page_limit: config.page_limit, json })
    }

    fn api(&self) -> &ApiClient {
        self.gateway.backend()
    }

    /// Navigate to `path`: the session snapshot when admitted, the redirect otherwise.
    fn enter(&self, path: &str) -> Result<Session, CliError> {
        let session = self.gateway.session().current();
        match self.routes.decide(path, &session) {
            Decision::Allow => Ok(session),
            Decision::RedirectTo(target) => {
                tracing::debug!(path, %target, "navigation redirected");
                Err(CliError::Redirected { path: path.to_owned(), target })
            }
        }
    }

    /// Navigate and return the admitted identity with its token.
    fn enter_as(&self, path: &str) -> Result<(Identity, String), CliError> {
        let session = self.enter(path)?;
        match (session.identity(), session.token()) {
            (Some(identity), Some(token)) => Ok((identity.clone(), token.to_owned())),
            _ => Err(ApiError::not_logged_in().into()),
        }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }

    fn say(&self, message: &str) -> Result<(), CliError> {
        self.emit(&serde_json::json!({ "message": message }), || format!("{message}\n"))
    }

    // -------------------------------------------------------------------------
    // auth
    // -------------------------------------------------------------------------

    async fn login(&self, email: &str, password: &str) -> Result<(), CliError> {
        self.gateway.login(email.trim(), password).await?;
        self.whoami()
    }

    async fn register(&self, email: &str, password: &str, confirm: &str, name: &str) -> Result<(), CliError> {
        let form = forms::validate_registration(email, password, confirm, name)?;
        self.gateway.register(&form.email, &form.password, form.display_name.as_deref()).await?;
        self.whoami()
    }

    fn whoami(&self) -> Result<(), CliError> {
        let session = self.gateway.session().current();
        self.emit(&session.identity(), || format!("{}\n", render::session(&session)))
    }

    fn dashboard(&self) -> Result<(), CliError> {
        let (identity, _) = self.enter_as(DASHBOARD_PATH)?;
        let session = self.gateway.session().current();
        let routes = self.routes.permitted_routes(&session);
        let view = serde_json::json!({ "user": identity, "views": routes });
        self.emit(&view, || render::dashboard(&identity, &routes))
    }

    fn route(&self, path: &str) -> Result<(), CliError> {
        let decision = self.routes.decide(path, &self.gateway.session().current());
        let target = match &decision {
            Decision::Allow => None,
            Decision::RedirectTo(target) => Some(target.as_str()),
        };
        let view = serde_json::json!({ "path": path, "allow": target.is_none(), "redirect_to": target });
        self.emit(&view, || format!("{}\n", render::decision(path, &decision)))
    }

    // -------------------------------------------------------------------------
    // profile
    // -------------------------------------------------------------------------

    async fn profile(&self, command: ProfileSubcommand) -> Result<(), CliError> {
        let (current, _) = self.enter_as(PROFILE_PATH)?;
        let identity = match command {
            ProfileSubcommand::Show => current,
            ProfileSubcommand::Refresh => self.gateway.refresh_profile().await?,
            ProfileSubcommand::Update { name, email } => {
                let name = name.or(current.display_name).unwrap_or_default();
                let email = email.unwrap_or(current.email);
                let (name, email) = forms::validate_profile_update(&name, &email)?;
                self.gateway.update_profile(name.as_deref(), &email).await?;
                self.gateway.refresh_profile().await?
            }
        };
        self.emit(&identity, || render::identity(&identity))
    }

    // -------------------------------------------------------------------------
    // pedidos
    // -------------------------------------------------------------------------

    async fn pedidos(&self, command: PedidosSubcommand) -> Result<(), CliError> {
        match command {
            PedidosSubcommand::List(args) => {
                let (_, token) = self.enter_as(PEDIDOS_PATH)?;
                let filters = PedidoFilters {
                    estado: args.estado,
                    prioridad: args.prioridad,
                    fecha_desde: args.desde.as_deref().map(parse_filter_date).transpose()?,
                    fecha_hasta: args.hasta.as_deref().map(parse_filter_date).transpose()?,
                    limit: args.limit.unwrap_or(self.page_limit),
                    offset: args.offset,
                };
                let pedidos = self.api().list_pedidos(&token, &filters).await?;
                self.emit(&pedidos, || render::pedidos(&pedidos))
            }
            PedidosSubcommand::Estado { id, estado, from } => {
                let (_, token) = self.enter_as(PEDIDOS_PATH)?;
                if from.is_some_and(|current| !needs_transition(current, estado)) {
                    return self.say(&format!("order {id} is already {}", estado.label()));
                }
                self.api().cambiar_estado(&token, id, estado).await?;
                self.say(&format!("order {id} is now {}", estado.label()))
            }
            PedidosSubcommand::Stats => {
                let (_, token) = self.enter_as(ESTADISTICAS_PATH)?;
                let stats = self.api().estadisticas(&token).await?;
                self.emit(&stats, || render::estadisticas(&stats))
            }
        }
    }

    // -------------------------------------------------------------------------
    // users
    // -------------------------------------------------------------------------

    async fn users(&self, command: UsersSubcommand) -> Result<(), CliError> {
        match command {
            UsersSubcommand::List { search, role } => {
                let (_, token) = self.enter_as(USERS_PATH)?;
                let all = self.api().list_users(&token).await?;
                let shown = filter_users(&all, &search, role);
                self.emit(&shown, || render::users(&shown, UserCounts::of(&all)))
            }
            UsersSubcommand::Show { id } => {
                let (_, token) = self.enter_as(&user_edit_path(&id))?;
                let user = self.api().get_user(&token, &id).await?;
                self.emit(&user, || render::identity(&user))
            }
            UsersSubcommand::Update { id, email, name, role, active } => {
                let (current, token) = self.enter_as(&user_edit_path(&id))?;
                let existing = self.api().get_user(&token, &id).await?;
                let mut update = UserUpdate::from_identity(&existing);
                let (full_name, email) = forms::validate_profile_update(
                    name.as_deref().unwrap_or(&update.full_name),
                    email.as_deref().unwrap_or(&update.email),
                )?;
                update.full_name = full_name.unwrap_or_default();
                update.email = email;
                update.role = role.unwrap_or(update.role);
                update.is_active = active.unwrap_or(update.is_active);
                self.api().update_user(&token, &id, &update).await?;
                if existing.id == current.id {
                    self.gateway.refresh_profile().await?;
                }
                self.say(&format!("user {id} updated"))
            }
            UsersSubcommand::Activate { id } => self.set_active(&id, true).await,
            UsersSubcommand::Deactivate { id } => self.set_active(&id, false).await,
            UsersSubcommand::Password { id, password, confirm_password } => {
                let (_, token) = self.enter_as(&user_edit_path(&id))?;
                let password = forms::validate_password_change(&password, &confirm_password)?;
                self.api().change_user_password(&token, &id, &password).await?;
                self.say(&format!("password changed for user {id}"))
            }
        }
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), CliError> {
        let (current, token) = self.enter_as(USERS_PATH)?;
        let target = self.api().get_user(&token, id).await?;
        if !can_toggle_active(&target, &current) {
            return Err(CliError::OwnAccount);
        }
        self.api().set_user_active(&token, id, active).await?;
        let state = if active { "activated" } else { "deactivated" };
        self.say(&format!("user {} {state}", target.label()))
    }
}

fn user_edit_path(id: &str) -> String {
    format!("{USERS_PATH}/{id}/edit")
}
