//! command line storefront
//!
//! Browse the menu, manage the cart and place orders from a terminal.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use derive_more::Display;
use log::{debug, info};
use storefront::client::controller::cart::DEFAULT_QUANTITY;
use storefront::client::model::cart::{AddedToCart, Cart};
use storefront::client::model::config::{ClientConfig, DEFAULT_API_URL, DEFAULT_AUTH_SCHEME, DEFAULT_SESSION_FILE, DEFAULT_TIMEOUT_SECONDS};
use storefront::client::model::order::CreateOrderRequest;
use storefront::{ClientError, Storefront};

const TIMEOUT_PARSING_FAILED_MSG: &str = "failed to parse STOREFRONT_TIMEOUT_SECS";

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "order food from the storefront backend", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// check the backend is up
    Health,
    /// create an account
    #[command(arg_required_else_help = true)]
    Register {
        username: String,
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// sign in and remember the session
    #[command(arg_required_else_help = true)]
    Login {
        username: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// forget the session
    Logout,
    /// show the signed in user
    Whoami,
    /// list the menu
    Foods,
    /// show one food
    #[command(arg_required_else_help = true)]
    Food { id: i64 },
    /// cart related ops
    #[command(arg_required_else_help = true)]
    Cart(CartArgs),
    /// place an order for everything in the cart
    Order {
        #[arg(long, value_name = "KEY")]
        idempotency_key: Option<String>,
    },
}

#[derive(Debug, Args)]
struct CartArgs {
    #[command(subcommand)]
    command: CartCmds,
}

#[derive(Debug, Subcommand)]
enum CartCmds {
    Show,
    #[command(arg_required_else_help = true)]
    Add {
        food_id: i64,
        #[arg(short, long, default_value_t = DEFAULT_QUANTITY, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// a quantity below 1 removes the line
    #[command(arg_required_else_help = true)]
    Set {
        line_id: i64,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    #[command(arg_required_else_help = true)]
    Remove { line_id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // bootstrap
    // a. env
    let env = env::var("APP_ENV")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(Env::Dev); // default dev env if absent

    let dotenv_loaded = match env {
        Env::Prod | Env::Stg => false,
        Env::Dev => dotenvy::from_path(Path::new(".env.dev")).is_ok(),
    };

    // b. logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    debug!("env={} dotenv_loaded={}", env, dotenv_loaded);

    // c. config
    let timeout = env::var("STOREFRONT_TIMEOUT_SECS")
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS.to_string())
        .parse::<u64>()
        .context(TIMEOUT_PARSING_FAILED_MSG)?;
    let config = ClientConfig::new(env::var("STOREFRONT_API_URL").unwrap_or(DEFAULT_API_URL.to_string()))
        .with_timeout(Duration::from_secs(timeout))
        .with_session_file(env::var("STOREFRONT_SESSION_FILE").unwrap_or(DEFAULT_SESSION_FILE.to_string()))
        .with_auth_scheme(env::var("STOREFRONT_AUTH_SCHEME").unwrap_or(DEFAULT_AUTH_SCHEME.to_string()));
    info!("using backend {}", config.api_url);

    // d. run
    let args = Cli::parse();
    let storefront = Storefront::from_config(&config);
    let result = tokio::select! {
        result = run(&storefront, args.command) => result,
        _ = tokio::signal::ctrl_c() => {
            storefront.close();
            Err(ClientError::Cancelled)
        }
    };
    if let Err(e) = &result {
        if e.is_unauthorized() {
            eprintln!("{}", unauthorized_hint(storefront.session().is_authenticated()));
        }
    }
    result.map_err(anyhow::Error::from)
}

/// What to do about a 401/403, a stored session that got rejected has to be dropped first.
fn unauthorized_hint(signed_in: bool) -> &'static str {
    if signed_in {
        "the saved session was rejected, run `storefront logout` then `storefront login <username>`"
    } else {
        "please sign in with `storefront login <username>`"
    }
}

async fn run(storefront: &Storefront, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Health => {
            let health = storefront.health().await?;
            println!("{} {}", health.status, health.message.unwrap_or_default());
        }
        Commands::Register { username, email, password } => {
            let created = storefront.sign_up(&username, &email, &password).await?;
            println!("registered {} (user id = {}), you can log in now", created.username, created.user_id);
        }
        Commands::Login { username, password } => {
            let session = storefront.sign_in(&username, &password).await?;
            println!("signed in as {}", session.username.unwrap_or(username));
        }
        Commands::Logout => {
            storefront.sign_out()?;
            println!("signed out");
        }
        Commands::Whoami => match storefront.session().username() {
            Some(username) if storefront.session().is_authenticated() => {
                println!("{} (user id = {:?})", username, storefront.session().user_id());
            }
            _ => println!("not signed in"),
        },
        Commands::Foods => {
            for food in storefront.menu().await? {
                println!("#{:<4} {:<30} ${}", food.id, food.name, food.price);
            }
        }
        Commands::Food { id } => match storefront.food(id).await? {
            Some(food) => {
                println!("#{} {} ${}", food.id, food.name, food.price);
                println!("{}", food.description);
                println!("image: {}", storefront.image_url(&food));
            }
            None => println!("food {} not found", id),
        },
        Commands::Cart(cart) => run_cart(storefront, cart.command).await?,
        Commands::Order { idempotency_key } => {
            // the empty cart check works on the last fetched cart
            storefront.cart().fetch_cart().await?;
            let request = idempotency_key.map(CreateOrderRequest::with_idempotency_key).unwrap_or_default();
            let order = storefront.orders().submit_with(request).await?;
            println!("order #{} placed at {}, total ${}", order.id, order.created_at.format("%Y-%m-%dT%H:%M:%S"), order.total_price);
            for line in &order.items {
                println!("  {} x{} @ ${}", line.food.name, line.quantity, line.price);
            }
        }
    }
    Ok(())
}

async fn run_cart(storefront: &Storefront, command: CartCmds) -> Result<(), ClientError> {
    let cart = match command {
        CartCmds::Show => storefront.cart().fetch_cart().await?,
        CartCmds::Add { food_id, quantity } => {
            match storefront.cart().add_item(food_id, quantity).await? {
                AddedToCart::Line(line) => println!("{} x{} in cart (line {})", line.food.name, line.quantity, line.id),
                AddedToCart::Cart(_) => println!("added food {} to cart", food_id),
            }
            return Ok(());
        }
        CartCmds::Set { line_id, quantity } => storefront.cart().set_quantity(line_id, quantity).await?,
        CartCmds::Remove { line_id } => storefront.cart().remove_line(line_id).await?,
    };
    print_cart(&cart);
    Ok(())
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("your cart is empty");
        return;
    }
    for line in &cart.items {
        println!("line {:<4} {:<30} x{:<3} ${}", line.id, line.food.name, line.quantity, line.subtotal());
    }
    println!("total ${}", cart.total.round_dp(2));
}

#[derive(Debug, Display)]
#[non_exhaustive]
enum Env {
    Dev,
    Stg,
    Prod,
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "stg" => Ok(Self::Stg),
            "prod" => Ok(Self::Prod),
            s => Err(format!("Invalid Env: {s}")),
        }
    }
}
