use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::server::conn::AddrStream;
use hyper::service::make_service_fn;
use hyper::Server;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use pinboard::config::Config;
use pinboard::context::AppCtx;
use pinboard::repo::forbidden_tags;
use pinboard::routes;

#[derive(Debug, Clone, StructOpt)]
struct CommandOpt {
    #[structopt(subcommand)]
    subcommand: SubcommandOpt,
}

#[derive(Debug, Clone, StructOpt)]
enum SubcommandOpt {
    #[structopt(name = "server")]
    ServerCommandOpt(ServerCommandOpt),
    #[structopt(name = "migrate", about = "create the database schema")]
    MigrateCommandOpt,
    #[structopt(name = "forbidden-tags", about = "manage tags that pins may not carry")]
    ForbiddenTagsCommandOpt(ForbiddenTagsCommandOpt),
}

#[tokio::main]
async fn main() -> failure::Fallible<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let opt = CommandOpt::from_args();
    let config = Config::load()?;
    let ctx = AppCtx::new(&config)?;
    match opt.subcommand {
        SubcommandOpt::ServerCommandOpt(ref server_opt) => {
            server(&ctx, &config, server_opt).await?;
        }
        SubcommandOpt::MigrateCommandOpt => {
            // AppCtx::new has already brought the schema up to date.
            info!(database = %config.database_url, "schema is up to date");
        }
        SubcommandOpt::ForbiddenTagsCommandOpt(ref tags_opt) => {
            forbidden_tags_command(&ctx, tags_opt).await?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, StructOpt)]
pub(crate) struct ServerCommandOpt {
    #[structopt(short = "p", help = "on which port to listen")]
    port: Option<u16>,
}

pub(crate) async fn server(
    ctx: &AppCtx,
    config: &Config,
    opt: &ServerCommandOpt,
) -> failure::Fallible<()> {
    let service = routes::build_route(ctx);
    let new_svc = make_service_fn(move |_conn: &AddrStream| {
        let service = service.clone();
        async move { Ok::<_, Infallible>(service) }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], opt.port.unwrap_or(config.port)));
    let server = Server::try_bind(&addr)?.serve(new_svc);
    info!("Listening on {}", server.local_addr());

    server.with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutting down");
}

#[derive(Debug, Clone, StructOpt)]
pub(crate) enum ForbiddenTagsCommandOpt {
    #[structopt(name = "list")]
    List,
    #[structopt(name = "add")]
    Add { tag: String },
    #[structopt(name = "remove")]
    Remove { tag: String },
}

async fn forbidden_tags_command(
    ctx: &AppCtx,
    opt: &ForbiddenTagsCommandOpt,
) -> failure::Fallible<()> {
    match opt.clone() {
        ForbiddenTagsCommandOpt::List => {
            let tags = ctx.db(|conn| Ok(forbidden_tags::list(conn)?)).await?;
            for tag in tags {
                println!("{}", tag.tag);
            }
        }
        ForbiddenTagsCommandOpt::Add { tag } => {
            let tag = tag.trim().to_owned();
            if tag.is_empty() {
                failure::bail!("a forbidden tag cannot be blank");
            }
            let name = tag.clone();
            if ctx.db(move |conn| Ok(forbidden_tags::add(conn, &name)?)).await? {
                info!(%tag, "forbidden tag added");
            } else {
                info!(%tag, "tag was already forbidden");
            }
        }
        ForbiddenTagsCommandOpt::Remove { tag } => {
            let name = tag.clone();
            if !ctx.db(move |conn| Ok(forbidden_tags::remove(conn, &name)?)).await? {
                failure::bail!("{:?} is not a forbidden tag", tag);
            }
            info!(%tag, "forbidden tag removed");
        }
    }
    Ok(())
}
