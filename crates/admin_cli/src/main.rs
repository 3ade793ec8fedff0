use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};
use engine::{Engine, NewBinCmd, NewPartyCmd, NewProductCmd, OpContext, UnitOfMass};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "stockroom_admin")]
#[command(about = "Admin utilities for Stockroom (bootstrap users and catalogue)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./stockroom.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Product(ProductCommand),
    #[command(subcommand)]
    Quality(QualityCommand),
    #[command(subcommand)]
    Supplier(PartyCommand),
    #[command(subcommand)]
    Customer(PartyCommand),
    #[command(subcommand)]
    Stock(StockCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Skips the interactive prompt when set.
    #[arg(long, env = "STOCKROOM_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProductCommand {
    Create(ProductCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct ProductCreateArgs {
    #[arg(long)]
    name: String,
    /// Unit of mass acronym: ton, kg, hg, dag, g, dg, cg or mg.
    #[arg(long, default_value = "kg")]
    unit: String,
}

#[derive(Subcommand, Debug)]
enum QualityCommand {
    Create(QualityCreateArgs),
    List(QualityListArgs),
}

#[derive(Args, Debug)]
struct QualityCreateArgs {
    #[arg(long)]
    product: String,
    #[arg(long)]
    quality: String,
    /// Unit price in minor units.
    #[arg(long, default_value_t = 0)]
    price: i64,
}

#[derive(Args, Debug)]
struct QualityListArgs {
    #[arg(long)]
    product: String,
}

#[derive(Subcommand, Debug)]
enum PartyCommand {
    Create(PartyCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct PartyCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// Rebuild every bin quantity from the ledger.
    Recompute,
}

fn parse_unit(raw: &str) -> CliResult<UnitOfMass> {
    UnitOfMass::try_from(raw).map_err(|_| {
        format!(
            "unknown unit of mass: {raw} (expected one of {})",
            UnitOfMass::acronyms()
        )
        .into()
    })
}

/// Leaves raw mode when dropped, also on early returns.
struct RawMode;

impl RawMode {
    fn enable() -> CliResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_hidden(label: &str) -> CliResult<String> {
    let _raw = RawMode::enable()?;
    let mut err = std::io::stderr();
    execute!(
        err,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(label)
    )?;
    err.flush()?;

    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Enter => break,
            KeyCode::Esc => return Err("aborted".into()),
            KeyCode::Char('c') if ctrl => return Err("interrupted".into()),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(ch) if !ctrl => secret.push(ch),
            _ => {}
        }
    }
    execute!(err, Print("\r\n"))?;
    Ok(secret)
}

fn ask_password() -> CliResult<String> {
    for _ in 0..3 {
        let first = read_hidden("Password: ")?;
        let second = read_hidden("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }
        eprintln!("Passwords do not match. Try again.");
    }
    Err("too many attempts".into())
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let ctx = OpContext::new();

    match cli.command {
        Command::Migrate => println!("migrations applied"),
        Command::User(UserCommand::Create(args)) => {
            let password = match args.password {
                Some(password) => password,
                None => ask_password()?,
            };
            let user = engine
                .register_user(&ctx, &args.username, &password)
                .await?;
            println!("created user: {}", user.username);
        }
        Command::Product(ProductCommand::Create(args)) => {
            let unit = parse_unit(&args.unit)?;
            let product = engine
                .new_product(
                    &ctx,
                    NewProductCmd {
                        name: args.name,
                        unit,
                    },
                )
                .await?;
            println!("created product: {} ({})", product.name, product.code);
        }
        Command::Product(ProductCommand::List) => {
            for product in engine.list_products(&ctx).await? {
                println!("{}\t{}\t{}", product.code, product.unit, product.name);
            }
        }
        Command::Quality(QualityCommand::Create(args)) => {
            let bin = engine
                .new_bin(
                    &ctx,
                    NewBinCmd {
                        product_code: args.product,
                        quality: args.quality,
                        price: args.price,
                    },
                )
                .await?;
            println!(
                "created product quality: {} ({}) for {}",
                bin.quality, bin.id, bin.product_code
            );
        }
        Command::Quality(QualityCommand::List(args)) => {
            for bin in engine.bins_by_product(&ctx, &args.product).await? {
                println!("{}\t{}\t{}\t{}", bin.id, bin.quality, bin.quantity, bin.price);
            }
        }
        Command::Supplier(PartyCommand::Create(args)) => {
            let supplier = engine
                .new_supplier(
                    &ctx,
                    NewPartyCmd {
                        name: args.name,
                        address: args.address,
                        phone: args.phone,
                    },
                )
                .await?;
            println!("created supplier: {} ({})", supplier.name, supplier.code);
        }
        Command::Supplier(PartyCommand::List) => {
            for supplier in engine.list_suppliers(&ctx).await? {
                println!("{}\t{}", supplier.code, supplier.name);
            }
        }
        Command::Customer(PartyCommand::Create(args)) => {
            let customer = engine
                .new_customer(
                    &ctx,
                    NewPartyCmd {
                        name: args.name,
                        address: args.address,
                        phone: args.phone,
                    },
                )
                .await?;
            println!("created customer: {} ({})", customer.name, customer.code);
        }
        Command::Customer(PartyCommand::List) => {
            for customer in engine.list_customers(&ctx).await? {
                println!("{}\t{}", customer.code, customer.name);
            }
        }
        Command::Stock(StockCommand::Recompute) => {
            let corrected = engine.recompute_stock(&ctx).await?;
            if corrected.is_empty() {
                println!("every product quality matches the ledger");
            }
            for bin in corrected {
                println!("corrected {}: {}", bin.id, bin.quantity);
            }
        }
    }

    Ok(())
}
