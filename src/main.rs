use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use switchyard::{
    ActionFn, AppBuilder, Config, Context, Controller, Outcome, ReasonPhrase, Stage,
};

#[derive(Parser)]
#[command(name = "switchyard", about = "Serve the demo application")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:4221")]
    addr: String,
    /// Directory served under /static
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,
    /// List directories under /static instead of answering 403
    #[arg(long)]
    directory_index: bool,
    /// Enable anti-forgery checks, signing cookies with this key
    #[arg(long)]
    xsrf_key: Option<String>,
    /// Compress responses for clients that accept it
    #[arg(long)]
    gzip: bool,
    /// Match routes regardless of case
    #[arg(long)]
    case_insensitive: bool,
}

#[derive(Default)]
struct Home;

impl Controller for Home {
    fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
        ctx.write_str("switchyard is running\n");
        Ok(())
    }
}

#[derive(Default)]
struct Greeter;

impl Greeter {
    fn shout(&mut self, ctx: &mut Context<'_>) -> Outcome {
        let name = ctx.get_param("name").unwrap_or("stranger").to_uppercase();
        ctx.write_str(&format!("HELLO, {}!\n", name));
        Ok(())
    }
}

impl Controller for Greeter {
    fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
        let name = ctx.get_param("name").unwrap_or("stranger").to_owned();
        ctx.write_str(&format!("hello, {}\n", name));
        Ok(())
    }

    fn actions() -> Vec<(&'static str, ActionFn<Self>)> {
        vec![("Shout", Greeter::shout as ActionFn<Self>)]
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = Config {
        static_paths: vec![("/static".to_owned(), cli.static_dir)],
        directory_index: cli.directory_index,
        enable_xsrf: cli.xsrf_key.is_some(),
        xsrf_key: cli.xsrf_key.unwrap_or_else(|| Config::default().xsrf_key),
        gzip: cli.gzip,
        case_sensitive: !cli.case_insensitive,
        ..Config::default()
    };

    let mut builder = AppBuilder::new(config);
    builder
        .add_route::<Home>("/", &[])
        .add_route::<Greeter>("/hello/:name", &[])
        .add_route::<Greeter>("/shout/:name", &["get:Shout"])
        .insert_filter("/private/*", Stage::BeforeRouter, |ctx| {
            ctx.redirect("/", ReasonPhrase::Found);
        });

    if let Err(err) = switchyard::run(&cli.addr, builder.build()) {
        error!("{:?}", err);
    }
}
